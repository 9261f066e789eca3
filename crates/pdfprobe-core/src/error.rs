//! Error types for the pdfprobe-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pdfprobe library.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// The input path does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The input could not be turned into PDF bytes.
    #[error("invalid input: {0}")]
    Input(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    /// Short classification used as a structured logging field.
    ///
    /// The wire contract only ever carries the display string.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Pdf(PdfError::Encrypted) => "encrypted",
            ProbeError::Pdf(PdfError::Parse(_)) => "parse",
            ProbeError::Pdf(_) => "pdf",
            ProbeError::NotFound(_) => "not_found",
            ProbeError::Input(_) => "input",
            ProbeError::Io(_) => "io",
            ProbeError::Config(_) => "config",
        }
    }
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from a page.
    #[error("failed to extract text from page {page}: {reason}")]
    TextExtraction { page: u32, reason: String },

    /// Failed to enumerate or decode images on a page.
    #[error("failed to extract images from page {page}: {reason}")]
    ImageExtraction { page: u32, reason: String },

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Result type for the pdfprobe library.
pub type Result<T> = std::result::Result<T, ProbeError>;
