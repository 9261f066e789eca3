//! Accepted input forms, all reduced to raw PDF bytes before extraction.

use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::error::{ProbeError, Result};

/// Where the PDF bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfInput {
    /// Raw PDF content.
    Bytes(Vec<u8>),
    /// A file on disk.
    Path(PathBuf),
    /// Base64-encoded PDF content, optionally as a `data:` URL.
    Base64(String),
}

impl PdfInput {
    /// Resolve the input to raw, non-empty PDF bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let bytes = match self {
            PdfInput::Bytes(bytes) => bytes,
            PdfInput::Path(path) => {
                if !path.exists() {
                    return Err(ProbeError::NotFound(path));
                }
                std::fs::read(&path)?
            }
            PdfInput::Base64(encoded) => decode_base64(&encoded)?,
        };

        if bytes.is_empty() {
            return Err(ProbeError::Input("empty input".to_string()));
        }
        Ok(bytes)
    }
}

/// Decode base64 PDF content, tolerating whitespace and a `data:` prefix.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    let trimmed = encoded.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| ProbeError::Input("data URL is not base64".to_string()))?,
        None => trimmed,
    };

    // Line-wrapped base64 is common in email and JSON exports.
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    BASE64
        .decode(compact.as_bytes())
        .map_err(|e| ProbeError::Input(format!("Invalid base64 encoding: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bytes_pass_through() {
        let input = PdfInput::Bytes(b"%PDF-1.7".to_vec());
        assert_eq!(input.into_bytes().unwrap(), b"%PDF-1.7".to_vec());
    }

    #[test]
    fn test_path_and_base64_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();

        let from_path = PdfInput::Path(path).into_bytes().unwrap();
        let from_b64 = PdfInput::Base64(BASE64.encode(b"%PDF-1.4 body")).into_bytes().unwrap();
        assert_eq!(from_path, from_b64);
    }

    #[test]
    fn test_base64_with_data_url_and_newlines() {
        let encoded = BASE64.encode(b"%PDF-1.5 hello");
        let (a, b) = encoded.split_at(6);
        let wrapped = format!("  data:application/pdf;base64,{}\n{}\n", a, b);

        assert_eq!(decode_base64(&wrapped).unwrap(), b"%PDF-1.5 hello".to_vec());
    }

    #[test]
    fn test_invalid_base64() {
        let err = decode_base64("not*base64!").unwrap_err();
        assert!(err.to_string().contains("Invalid base64"));
    }

    #[test]
    fn test_missing_file() {
        let err = PdfInput::Path(PathBuf::from("/no/such/file.pdf"))
            .into_bytes()
            .unwrap_err();
        assert!(matches!(err, ProbeError::NotFound(_)));
        assert_eq!(err.to_string(), "File not found: /no/such/file.pdf");
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(PdfInput::Bytes(Vec::new()).into_bytes().unwrap_err().kind(), "input");
        assert_eq!(PdfInput::Base64(String::new()).into_bytes().unwrap_err().kind(), "input");
    }
}
