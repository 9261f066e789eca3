//! Text and image extraction with profile photo selection.

mod extractor;
pub mod profile;

pub use extractor::{ExtractedImage, Extraction, Extractor, PAGE_SEPARATOR, page_marker};
pub use profile::is_profile_candidate;
