//! Data models: configuration and the extraction result record.

pub mod config;
pub mod result;

pub use config::{PdfConfig, ProbeConfig, ServerConfig};
pub use result::{ExtractionResult, ImageInfo};
