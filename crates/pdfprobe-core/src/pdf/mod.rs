//! PDF document access.
//!
//! The extraction pipeline only talks to [`PdfDocument`]; [`LopdfDocument`]
//! is the production implementation on top of `lopdf`.

mod decode;
mod document;

pub use decode::decode_image;
pub use document::LopdfDocument;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// One embedded raster image, decoded to a self-contained file format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Format extension (jpeg, jpx, jb2, png).
    pub ext: String,
}

/// An opened PDF document.
pub trait PdfDocument {
    /// Number of pages; pages are numbered `1..=page_count()`.
    fn page_count(&self) -> u32;

    /// Plain text of a single page.
    fn page_text(&self, page: u32) -> Result<String>;

    /// Images referenced by a page, in the order the document lists them.
    fn page_images(&self, page: u32) -> Result<Vec<DecodedImage>>;
}
