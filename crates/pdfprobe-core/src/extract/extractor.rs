//! Page text and image extraction pipeline.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use tracing::{debug, trace, warn};

use super::profile::is_profile_candidate;
use crate::error::Result;
use crate::input::PdfInput;
use crate::models::config::PdfConfig;
use crate::models::result::ExtractionResult;
use crate::pdf::{LopdfDocument, PdfDocument};

/// Separator placed between page fragments.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Header placed before the text of a page.
///
/// The wording is kept as existing consumers expect it ("page N" in Arabic).
pub fn page_marker(page: u32) -> String {
    format!("--- صفحة {} ---", page)
}

/// One image pulled out of the document, with its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// Page number (1-indexed).
    pub page: u32,
    /// Position within the page (0-indexed).
    pub index: u32,
    /// Format extension.
    pub ext: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoded image bytes.
    pub data: Vec<u8>,
}

impl ExtractedImage {
    /// File name used when images are written to disk, e.g. `p1_img0.jpeg`.
    pub fn file_name(&self) -> String {
        format!("p{}_img{}.{}", self.page, self.index, self.ext)
    }
}

/// Everything extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Page-marked text of all non-blank pages.
    pub text: String,
    /// Images in page, then index order.
    pub images: Vec<ExtractedImage>,
    /// Position in `images` of the profile photo, if one was found.
    pub profile_index: Option<usize>,
}

impl Extraction {
    /// The selected profile photo.
    pub fn profile_image(&self) -> Option<&ExtractedImage> {
        self.profile_index.and_then(|i| self.images.get(i))
    }
}

/// Stateless PDF extractor; every call opens and owns its own document.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: PdfConfig,
}

impl Extractor {
    /// Create an extractor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with the given PDF settings.
    pub fn with_config(config: PdfConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PdfConfig {
        &self.config
    }

    /// Extract from raw PDF bytes. Never fails: errors become a failed result.
    pub fn extract(&self, data: &[u8]) -> ExtractionResult {
        match self.extract_guarded(data) {
            Ok(extraction) => ExtractionResult::from_extraction(&extraction),
            Err(message) => ExtractionResult::failure(message),
        }
    }

    /// Like [`Extractor::extract_detailed`], but every failure, parser panics
    /// included, is logged and reduced to its message.
    pub fn extract_guarded(&self, data: &[u8]) -> std::result::Result<Extraction, String> {
        match catch_unwind(AssertUnwindSafe(|| self.extract_detailed(data))) {
            Ok(Ok(extraction)) => Ok(extraction),
            Ok(Err(e)) => {
                warn!(kind = e.kind(), "Extraction failed: {}", e);
                Err(e.to_string())
            }
            Err(_) => {
                warn!(kind = "panic", "PDF parser panicked");
                Err("internal error while parsing PDF".to_string())
            }
        }
    }

    /// Extract from a file on disk.
    pub fn extract_path(&self, path: &Path) -> ExtractionResult {
        self.extract_input(PdfInput::Path(path.to_path_buf()))
    }

    /// Decode any accepted input form, then extract.
    pub fn extract_input(&self, input: PdfInput) -> ExtractionResult {
        match input.into_bytes() {
            Ok(data) => self.extract(&data),
            Err(e) => {
                warn!(kind = e.kind(), "Input rejected: {}", e);
                ExtractionResult::failure(e.to_string())
            }
        }
    }

    /// Extract from raw PDF bytes, keeping image data and typed errors.
    pub fn extract_detailed(&self, data: &[u8]) -> Result<Extraction> {
        let document = LopdfDocument::load(data, &self.config)?;
        self.extract_document(&document)
    }

    /// Run the pipeline over an opened document.
    pub fn extract_document<D: PdfDocument + ?Sized>(&self, document: &D) -> Result<Extraction> {
        let mut page_count = document.page_count();
        if self.config.max_pages > 0 {
            let limit = u32::try_from(self.config.max_pages).unwrap_or(u32::MAX);
            page_count = page_count.min(limit);
        }

        let text = collect_text(document, page_count);

        let mut images = Vec::new();
        let mut profile_index = None;

        for page in 1..=page_count {
            for (index, image) in document.page_images(page)?.into_iter().enumerate() {
                if profile_index.is_none()
                    && is_profile_candidate(page, image.width, image.height, image.data.len())
                {
                    debug!(
                        "Profile candidate: page {} image {} ({}x{}, {} bytes)",
                        page,
                        index,
                        image.width,
                        image.height,
                        image.data.len()
                    );
                    profile_index = Some(images.len());
                }

                images.push(ExtractedImage {
                    page,
                    index: index as u32,
                    ext: image.ext,
                    width: image.width,
                    height: image.height,
                    data: image.data,
                });
            }
        }

        debug!(
            "Extracted {} chars of text and {} images from {} pages",
            text.chars().count(),
            images.len(),
            page_count
        );

        Ok(Extraction {
            text,
            images,
            profile_index,
        })
    }
}

/// Join the text of all non-blank pages, each behind its page marker.
///
/// A page whose text cannot be read, or whose text extraction panics, is
/// treated as blank.
fn collect_text<D: PdfDocument + ?Sized>(document: &D, page_count: u32) -> String {
    let mut fragments = Vec::new();

    for page in 1..=page_count {
        match catch_unwind(AssertUnwindSafe(|| document.page_text(page))) {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                fragments.push(format!("{}\n{}", page_marker(page), text));
            }
            Ok(Ok(_)) => trace!("Page {} has no text", page),
            Ok(Err(e)) => warn!("Skipping text of page {}: {}", page, e),
            Err(_) => warn!(
                kind = "panic",
                "Skipping text of page {}: parser panicked",
                page
            ),
        }
    }

    fragments.join(PAGE_SEPARATOR)
}
