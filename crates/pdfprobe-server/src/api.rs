//! API handlers for the pdfprobe server
//!
//! Provides REST endpoints for:
//! - PDF upload extraction (multipart)
//! - Base64 PDF extraction (JSON)
//! - Service status and health

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Request, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::header::CONTENT_LENGTH,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pdfprobe_core::ExtractionResult;
use pdfprobe_core::input::decode_base64;

use crate::error::ServerError;
use crate::state::AppState;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/extract", post(handle_extract))
        .route("/extract-base64", post(handle_extract_base64))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        // The last layer added runs first: key check, then size check
        .route_layer(middleware::from_fn_with_state(state.clone(), check_body_size))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .nest("/api", api)
        .with_state(state)
}

/// Service status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Handler: GET /
pub async fn handle_root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        service: "pdfprobe",
    })
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfprobe-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Middleware: reject requests without the configured API key.
///
/// Runs before any extractor so an unauthenticated body is never read.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let key_matches = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|key| key == &*state.api_key);

    match key_matches {
        Some(true) => Ok(next.run(request).await),
        Some(false) => {
            warn!("Rejected request to {} with invalid API key", request.uri());
            Err(ServerError::Unauthorized)
        }
        None => {
            warn!("Rejected request to {} without API key", request.uri());
            Err(ServerError::Unauthorized)
        }
    }
}

/// Middleware: reject bodies whose declared length exceeds the limit.
///
/// Streamed bodies without a length are cut off by `DefaultBodyLimit`.
pub async fn check_body_size(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());

    if declared.is_some_and(|len| len > state.max_body_bytes) {
        warn!(
            "Rejected {} byte body (limit {})",
            declared.unwrap_or_default(),
            state.max_body_bytes
        );
        return Err(ServerError::PayloadTooLarge(state.max_body_bytes));
    }

    Ok(next.run(request).await)
}

/// Handler: POST /api/extract
///
/// Expects a multipart upload with the PDF in the `file` (or `pdf`) field.
pub async fn handle_extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResult>, ServerError> {
    let limit = state.max_body_bytes;
    let mut multipart =
        multipart.map_err(|e| ServerError::from_multipart_rejection(e, limit))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::from_multipart(e, limit))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" && name != "pdf" {
            debug!("Skipping multipart field '{}'", name);
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(ServerError::InvalidRequest(
                "File must be a PDF".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::from_multipart(e, limit))?;
        if data.is_empty() {
            return Err(ServerError::InvalidRequest(
                "Uploaded file is empty".to_string(),
            ));
        }

        info!("Extract request: file={}, size={}", filename, data.len());
        return run_extraction(&state, data.to_vec()).await.map(Json);
    }

    Err(ServerError::InvalidRequest(
        "No file provided. Use field name 'file' or 'pdf'".to_string(),
    ))
}

/// Base64 extraction request body
#[derive(Deserialize)]
pub struct Base64Request {
    /// Base64-encoded PDF content
    #[serde(default)]
    pub pdf_base64: Option<String>,
}

/// Handler: POST /api/extract-base64
pub async fn handle_extract_base64(
    State(state): State<AppState>,
    payload: Result<Json<Base64Request>, JsonRejection>,
) -> Result<Json<ExtractionResult>, ServerError> {
    let Json(req) = payload.map_err(|e| ServerError::from_json(e, state.max_body_bytes))?;

    let encoded = req
        .pdf_base64
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("pdf_base64 is required".to_string()))?;

    let data = decode_base64(&encoded).map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
    if data.is_empty() {
        return Err(ServerError::InvalidRequest(
            "pdf_base64 decodes to no data".to_string(),
        ));
    }

    info!("Extract-base64 request: size={}", data.len());
    run_extraction(&state, data).await.map(Json)
}

/// Run one extraction on the blocking pool, bounded by the state's
/// semaphore. The timeout covers the wait for a permit as well.
async fn run_extraction(state: &AppState, data: Vec<u8>) -> Result<ExtractionResult, ServerError> {
    let extraction = async {
        let permit = state
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        let extractor = state.extractor.clone();
        // The permit lives as long as the blocking work, even past a timeout
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            extractor.extract(&data)
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
    };

    let result = match tokio::time::timeout(state.timeout, extraction).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("Extraction timed out after {:?}", state.timeout);
            return Err(ServerError::Timeout(state.timeout.as_secs()));
        }
    };

    match result.error() {
        Some(error) => warn!("Extraction failed: {}", error),
        None => info!(
            "Extracted {} chars, {} images, profile photo: {}",
            result.text_length(),
            result.images_count(),
            result.profile_image_base64().is_some()
        ),
    }

    Ok(result)
}
