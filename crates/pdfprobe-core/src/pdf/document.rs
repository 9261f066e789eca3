//! `PdfDocument` implementation on top of lopdf.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use super::{DecodedImage, PdfDocument, Result, decode_image};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Depth limit when walking inherited page attributes.
const MAX_TREE_DEPTH: usize = 64;

/// An opened PDF backed by `lopdf::Document`.
pub struct LopdfDocument {
    document: Document,
    pages: Vec<ObjectId>,
}

impl LopdfDocument {
    /// Parse a PDF from memory.
    pub fn load(data: &[u8], config: &PdfConfig) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if document.is_encrypted() {
            if !config.decrypt_empty_password || document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        // get_pages() is keyed by page number, so values come out in page order
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!("Loaded PDF with {} pages", pages.len());

        Ok(Self { document, pages })
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    /// Resources dictionary for a page, following /Parent inheritance.
    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut node_id = page_id;

        for _ in 0..MAX_TREE_DEPTH {
            let dict = self.document.get_dictionary(node_id).ok()?;

            if let Ok(resources) = dict.get(b"Resources") {
                if let Ok((_, Object::Dictionary(res_dict))) = self.document.dereference(resources) {
                    return Some(res_dict);
                }
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => node_id = *parent_id,
                _ => return None,
            }
        }

        None
    }

    /// Append every image reachable from `resources`, descending into forms.
    fn collect_images(
        &self,
        resources: &Dictionary,
        page: u32,
        visited_forms: &mut HashSet<ObjectId>,
        images: &mut Vec<DecodedImage>,
    ) -> Result<()> {
        let Ok(xobjects) = resources.get(b"XObject") else {
            return Ok(());
        };
        let Ok((_, Object::Dictionary(xobjects))) = self.document.dereference(xobjects) else {
            return Ok(());
        };

        for (name, entry) in xobjects.iter() {
            let (object_id, object) = match self.document.dereference(entry) {
                Ok(found) => found,
                Err(e) => {
                    warn!(
                        "Skipping unresolvable XObject /{} on page {}: {}",
                        String::from_utf8_lossy(name),
                        page,
                        e
                    );
                    continue;
                }
            };
            let Object::Stream(stream) = object else {
                continue;
            };

            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => images.push(decode_image(&self.document, stream, page)?),
                Ok(b"Form") => {
                    if let Some(id) = object_id {
                        if !visited_forms.insert(id) {
                            continue;
                        }
                    }
                    let form_resources = stream
                        .dict
                        .get(b"Resources")
                        .and_then(|r| self.document.dereference(r));
                    if let Ok((_, Object::Dictionary(form_resources))) = form_resources {
                        self.collect_images(form_resources, page, visited_forms, images)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        self.page_id(page)?;
        self.document
            .extract_text(&[page])
            .map_err(|e| PdfError::TextExtraction {
                page,
                reason: e.to_string(),
            })
    }

    fn page_images(&self, page: u32) -> Result<Vec<DecodedImage>> {
        let page_id = self.page_id(page)?;
        let mut images = Vec::new();

        if let Some(resources) = self.page_resources(page_id) {
            let mut visited_forms = HashSet::new();
            self.collect_images(resources, page, &mut visited_forms, &mut images)?;
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{PdfBuilder, TestImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_rejects_garbage() {
        let err = LopdfDocument::load(b"definitely not a pdf", &PdfConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_page_text() {
        let bytes = PdfBuilder::new().text_page("hello").build();
        let doc = LopdfDocument::load(&bytes, &PdfConfig::default()).unwrap();

        assert_eq!(doc.page_count(), 1);
        assert!(doc.page_text(1).unwrap().contains("hello"));
    }

    #[test]
    fn test_invalid_page() {
        let bytes = PdfBuilder::new().text_page("hello").build();
        let doc = LopdfDocument::load(&bytes, &PdfConfig::default()).unwrap();

        assert!(matches!(doc.page_text(0), Err(PdfError::InvalidPage(0))));
        assert!(matches!(doc.page_images(2), Err(PdfError::InvalidPage(2))));
    }

    #[test]
    fn test_page_images_in_resource_order() {
        let bytes = PdfBuilder::new()
            .page(
                "",
                vec![
                    TestImage::jpeg(300, 200, 1_000),
                    TestImage::jpeg(200, 300, 2_000),
                    TestImage::raw_gray(4, 4),
                ],
            )
            .build();
        let doc = LopdfDocument::load(&bytes, &PdfConfig::default()).unwrap();

        let images = doc.page_images(1).unwrap();
        let summary: Vec<_> = images
            .iter()
            .map(|i| (i.ext.as_str(), i.width, i.height))
            .collect();
        assert_eq!(
            summary,
            vec![("jpeg", 300, 200), ("jpeg", 200, 300), ("png", 4, 4)]
        );
        assert_eq!(images[1].data.len(), 2_000);
    }

    #[test]
    fn test_images_inside_forms_are_found() {
        let bytes = PdfBuilder::new()
            .form_page(vec![TestImage::jpeg(10, 20, 64)])
            .build();
        let doc = LopdfDocument::load(&bytes, &PdfConfig::default()).unwrap();

        let images = doc.page_images(1).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!((images[0].width, images[0].height), (10, 20));
    }

    #[test]
    fn test_inherited_resources() {
        let bytes = PdfBuilder::new()
            .inherited_images(vec![TestImage::jpeg(10, 20, 64)])
            .text_page("one")
            .text_page("two")
            .build();
        let doc = LopdfDocument::load(&bytes, &PdfConfig::default()).unwrap();

        assert_eq!(doc.page_images(1).unwrap().len(), 1);
        assert_eq!(doc.page_images(2).unwrap().len(), 1);
    }

    #[test]
    fn test_every_image_encoding_is_recorded() {
        let palette: Vec<u8> = (0..=255u8).flat_map(|i| [i, 255 - i, i / 2]).collect();
        let bytes = PdfBuilder::new()
            .page(
                "",
                vec![
                    TestImage::indexed(100, 150, palette, vec![7; 100 * 150]),
                    TestImage::bilevel(80, 120),
                    TestImage::ccitt(80, 120, 512),
                ],
            )
            .build();
        let doc = LopdfDocument::load(&bytes, &PdfConfig::default()).unwrap();

        let images = doc.page_images(1).unwrap();
        let summary: Vec<_> = images
            .iter()
            .map(|i| (i.ext.as_str(), i.width, i.height))
            .collect();
        assert_eq!(
            summary,
            vec![("png", 100, 150), ("png", 80, 120), ("ccitt", 80, 120)]
        );
        assert_eq!(images[2].data.len(), 512);
    }

    #[test]
    fn test_empty_password_is_decrypted() {
        let bytes = PdfBuilder::new().text_page("secret").encrypted().build();
        let doc = LopdfDocument::load(&bytes, &PdfConfig::default()).unwrap();

        assert_eq!(doc.page_count(), 1);
        assert!(doc.page_text(1).unwrap().contains("secret"));
    }

    #[test]
    fn test_encrypted_rejected_when_decryption_disabled() {
        let bytes = PdfBuilder::new().text_page("secret").encrypted().build();
        let config = PdfConfig {
            decrypt_empty_password: false,
            ..PdfConfig::default()
        };

        let err = LopdfDocument::load(&bytes, &config).err().unwrap();
        assert!(matches!(err, PdfError::Encrypted));
    }
}
