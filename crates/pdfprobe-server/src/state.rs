//! Application state shared by every request

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use pdfprobe_core::{Extractor, PdfConfig, ServerConfig};

#[derive(Clone)]
pub struct AppState {
    /// Value every `/api` request must carry in `X-API-Key`
    pub api_key: Arc<str>,
    pub extractor: Extractor,
    /// Bounds the extractions running on the blocking pool
    pub permits: Arc<Semaphore>,
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(api_key: impl Into<Arc<str>>, pdf: PdfConfig, server: &ServerConfig) -> Self {
        Self {
            api_key: api_key.into(),
            extractor: Extractor::with_config(pdf),
            permits: Arc::new(Semaphore::new(server.max_concurrent_extractions.max(1))),
            timeout: Duration::from_secs(server.extraction_timeout_secs),
            max_body_bytes: server.max_body_bytes,
        }
    }
}
