//! Error types for the pdfprobe server
//!
//! These are transport-level failures. A PDF that cannot be parsed is not
//! one of them: it is answered with a regular `ExtractionResult` whose
//! `success` is false.

use axum::{
    Json,
    extract::multipart::MultipartError,
    extract::multipart::MultipartRejection,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid API key")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request body too large (max {0} bytes)")]
    PayloadTooLarge(usize),

    #[error("Extraction timeout after {0}s")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Map a body-reading failure, keeping the size limit distinct.
    fn from_body_status(status: StatusCode, message: String, limit: usize) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(limit)
        } else {
            ServerError::InvalidRequest(message)
        }
    }

    pub fn from_json(rejection: JsonRejection, limit: usize) -> Self {
        Self::from_body_status(rejection.status(), rejection.body_text(), limit)
    }

    pub fn from_multipart(err: MultipartError, limit: usize) -> Self {
        Self::from_body_status(err.status(), err.body_text(), limit)
    }

    pub fn from_multipart_rejection(rejection: MultipartRejection, limit: usize) -> Self {
        Self::from_body_status(rejection.status(), rejection.body_text(), limit)
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServerError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            ServerError::Timeout(_) => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
