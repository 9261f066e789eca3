//! Core library for PDF text and image extraction.
//!
//! This crate provides:
//! - Page-tagged text extraction in page order
//! - Embedded image enumeration and decoding
//! - A heuristic pick of the CV profile photo among the images
//! - The flat [`ExtractionResult`] record shared by the CLI and HTTP service

pub mod error;
pub mod extract;
pub mod input;
pub mod models;
pub mod pdf;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use error::{PdfError, ProbeError, Result};
pub use extract::{ExtractedImage, Extraction, Extractor};
pub use input::PdfInput;
pub use models::config::{PdfConfig, ProbeConfig, ServerConfig};
pub use models::result::{ExtractionResult, ImageInfo};
pub use pdf::{DecodedImage, LopdfDocument, PdfDocument};
