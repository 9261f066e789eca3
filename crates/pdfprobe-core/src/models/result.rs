//! The flat result record returned by every entry point.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::Serialize;

use crate::extract::Extraction;

/// Metadata for one extracted image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Page number (1-indexed).
    pub page: u32,
    /// Position within the page (0-indexed, library order).
    pub index: u32,
    /// Format extension (jpeg, png, ...).
    pub ext: String,
    /// Byte length of the decoded image.
    pub size: usize,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Set on the single image chosen as profile photo.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_profile_candidate: bool,
}

/// Outcome of one extraction, success or failure.
///
/// `text_length` and `images_count` are derived at construction and
/// cannot drift from `text` and `images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    success: bool,
    text: String,
    text_length: usize,
    images_count: usize,
    images: Vec<ImageInfo>,
    profile_image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ExtractionResult {
    /// Build the success shape from a completed extraction.
    pub fn from_extraction(extraction: &Extraction) -> Self {
        let images: Vec<ImageInfo> = extraction
            .images
            .iter()
            .enumerate()
            .map(|(i, img)| ImageInfo {
                page: img.page,
                index: img.index,
                ext: img.ext.clone(),
                size: img.data.len(),
                width: img.width,
                height: img.height,
                is_profile_candidate: extraction.profile_index == Some(i),
            })
            .collect();

        let profile_image_base64 = extraction.profile_image().map(|img| BASE64.encode(&img.data));

        Self {
            success: true,
            text_length: extraction.text.chars().count(),
            text: extraction.text.clone(),
            images_count: images.len(),
            images,
            profile_image_base64,
            error: None,
        }
    }

    /// Build the failure shape: empty text, no images, and a message.
    pub fn failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "unknown error".to_string();
        }

        Self {
            success: false,
            text: String::new(),
            text_length: 0,
            images_count: 0,
            images: Vec::new(),
            profile_image_base64: None,
            error: Some(message),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_length(&self) -> usize {
        self.text_length
    }

    pub fn images_count(&self) -> usize {
        self.images_count
    }

    pub fn images(&self) -> &[ImageInfo] {
        &self.images
    }

    pub fn profile_image_base64(&self) -> Option<&str> {
        self.profile_image_base64.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Compact JSON; non-ASCII text is emitted as UTF-8.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&Extraction> for ExtractionResult {
    fn from(extraction: &Extraction) -> Self {
        Self::from_extraction(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedImage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn image(page: u32, index: u32, len: usize) -> ExtractedImage {
        ExtractedImage {
            page,
            index,
            ext: "jpeg".to_string(),
            width: 100,
            height: 150,
            data: vec![7; len],
        }
    }

    #[test]
    fn test_failure_shape() {
        let result = ExtractionResult::failure("failed to parse PDF: bad header");
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(
            value,
            json!({
                "success": false,
                "text": "",
                "text_length": 0,
                "images_count": 0,
                "images": [],
                "profile_image_base64": null,
                "error": "failed to parse PDF: bad header",
            })
        );
    }

    #[test]
    fn test_failure_message_never_empty() {
        let result = ExtractionResult::failure("");
        assert_eq!(result.error(), Some("unknown error"));
    }

    #[test]
    fn test_success_shape_marks_candidate() {
        let extraction = Extraction {
            text: "--- صفحة 1 ---\nمرحبا".to_string(),
            images: vec![image(1, 0, 3), image(1, 1, 6000)],
            profile_index: Some(1),
        };

        let result = ExtractionResult::from_extraction(&extraction);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["success"], json!(true));
        assert!(value.get("error").is_none());
        assert_eq!(value["text_length"], json!(20));
        assert_eq!(value["images_count"], json!(2));
        assert!(value["images"][0].get("is_profile_candidate").is_none());
        assert_eq!(value["images"][1]["is_profile_candidate"], json!(true));
        assert_eq!(value["images"][1]["size"], json!(6000));
        assert_eq!(
            result.profile_image_base64(),
            Some(BASE64.encode(vec![7u8; 6000]).as_str())
        );
    }

    #[test]
    fn test_no_candidate_serializes_null() {
        let extraction = Extraction {
            text: String::new(),
            images: vec![image(2, 0, 10)],
            profile_index: None,
        };

        let value = serde_json::to_value(ExtractionResult::from(&extraction)).unwrap();
        assert_eq!(value["profile_image_base64"], serde_json::Value::Null);
    }

    #[test]
    fn test_json_keeps_rtl_text_unescaped() {
        let extraction = Extraction {
            text: "--- صفحة 1 ---\nسيرة ذاتية".to_string(),
            images: Vec::new(),
            profile_index: None,
        };

        let json = ExtractionResult::from_extraction(&extraction).to_json().unwrap();
        assert!(json.contains("سيرة ذاتية"));
    }
}
