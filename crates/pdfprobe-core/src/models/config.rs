//! Configuration structures for extraction and the HTTP service.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ProbeError, Result};

/// Upload ceiling enforced by the HTTP service (50 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Main configuration for pdfprobe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// HTTP service configuration.
    pub server: ServerConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Try the empty user password on encrypted documents.
    pub decrypt_empty_password: bool,

    /// Maximum pages to walk (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            decrypt_empty_password: true,
            max_pages: 0,
        }
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Value expected in the `X-API-Key` header.
    pub api_key: Option<String>,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,

    /// Extractions allowed to run at the same time.
    pub max_concurrent_extractions: usize,

    /// Per-request extraction timeout in seconds.
    pub extraction_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_key: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_concurrent_extractions: 4,
            extraction_timeout_secs: 60,
        }
    }
}

impl ProbeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ProbeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` if given, otherwise from the default location when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ProbeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Platform configuration file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pdfprobe")
            .join("config.json")
    }
}
