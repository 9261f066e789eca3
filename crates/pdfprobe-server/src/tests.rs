//! HTTP endpoint tests using axum-test

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use base64::{Engine, engine::general_purpose::STANDARD};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use pdfprobe_core::fixtures::{PdfBuilder, TestImage};
use pdfprobe_core::{PdfConfig, ServerConfig};

use crate::api::{API_KEY_HEADER, router};
use crate::state::AppState;

const KEY: &str = "test-key";

fn create_test_server_with(server: ServerConfig) -> TestServer {
    let state = AppState::new(KEY, PdfConfig::default(), &server);
    TestServer::new(router(state)).unwrap()
}

fn create_test_server() -> TestServer {
    create_test_server_with(ServerConfig::default())
}

fn key_header(value: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(API_KEY_HEADER),
        HeaderValue::from_static(value),
    )
}

fn pdf_form(field: &str, file_name: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        field.to_string(),
        Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_type("application/pdf"),
    )
}

fn profile_pdf() -> Vec<u8> {
    PdfBuilder::new()
        .page("Jane Doe", vec![TestImage::jpeg(200, 300, 8_000)])
        .build()
}

#[tokio::test]
async fn test_health_returns_200() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "pdfprobe-server");
}

#[tokio::test]
async fn test_root_needs_no_key() {
    let server = create_test_server();
    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_extract_requires_api_key() {
    let server = create_test_server();
    let response = server
        .post("/api/extract")
        .multipart(pdf_form("file", "cv.pdf", profile_pdf()))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json = response.json::<Value>();
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_wrong_api_key_rejected() {
    let server = create_test_server();
    let (name, value) = key_header("not-the-key");
    let response = server
        .post("/api/extract-base64")
        .add_header(name, value)
        .json(&json!({ "pdf_base64": STANDARD.encode(profile_pdf()) }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extract_upload() {
    let server = create_test_server();
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract")
        .add_header(name, value)
        .multipart(pdf_form("file", "hello.pdf", PdfBuilder::new().text_page("hello").build()))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["success"], true);
    assert!(json["text"].as_str().unwrap().contains("hello"));
    assert_eq!(json["images_count"], 0);
    assert_eq!(json["profile_image_base64"], Value::Null);
}

#[tokio::test]
async fn test_extract_accepts_pdf_field_and_uppercase_extension() {
    let server = create_test_server();
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract")
        .add_header(name, value)
        .multipart(pdf_form("pdf", "CV.PDF", profile_pdf()))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["success"], true);
    assert_eq!(json["images_count"], 1);
    assert_eq!(json["images"][0]["is_profile_candidate"], true);
}

#[tokio::test]
async fn test_extract_rejects_non_pdf_filename() {
    let server = create_test_server();
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract")
        .add_header(name, value)
        .multipart(pdf_form("file", "cv.docx", profile_pdf()))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Invalid request: File must be a PDF");
}

#[tokio::test]
async fn test_extract_without_file_field() {
    let server = create_test_server();
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract")
        .add_header(name, value)
        .multipart(MultipartForm::new().add_text("note", "no file here"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_corrupt_pdf_is_a_failed_result_not_an_http_error() {
    let server = create_test_server();
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract")
        .add_header(name, value)
        .multipart(pdf_form("file", "broken.pdf", b"not a pdf at all".to_vec()))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["success"], false);
    assert!(!json["error"].as_str().unwrap().is_empty());
    assert_eq!(json["text"], "");
    assert_eq!(json["text_length"], 0);
    assert_eq!(json["images_count"], 0);
}

#[tokio::test]
async fn test_extract_base64_finds_profile() {
    let server = create_test_server();
    let pdf = profile_pdf();
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract-base64")
        .add_header(name, value)
        .json(&json!({ "pdf_base64": STANDARD.encode(&pdf) }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["success"], true);

    let profile = STANDARD
        .decode(json["profile_image_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(profile.len(), 8_000);
}

#[tokio::test]
async fn test_extract_base64_requires_field() {
    let server = create_test_server();
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract-base64")
        .add_header(name, value)
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Invalid request: pdf_base64 is required"
    );
}

#[tokio::test]
async fn test_extract_base64_rejects_invalid_encoding() {
    let server = create_test_server();
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract-base64")
        .add_header(name, value)
        .json(&json!({ "pdf_base64": "%%% not base64 %%%" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"]
        .as_str()
        .unwrap()
        .contains("Invalid base64 encoding"));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = create_test_server_with(ServerConfig {
        max_body_bytes: 1024,
        ..ServerConfig::default()
    });
    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract-base64")
        .add_header(name, value)
        .json(&json!({ "pdf_base64": STANDARD.encode(vec![b'A'; 4096]) }))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.json::<Value>()["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_extraction_timeout_returns_408() {
    let state = AppState::new(
        KEY,
        PdfConfig::default(),
        &ServerConfig {
            max_concurrent_extractions: 1,
            extraction_timeout_secs: 1,
            ..ServerConfig::default()
        },
    );
    // Occupy the only extraction slot so the request cannot start in time
    let _busy = state.permits.clone().try_acquire_owned().unwrap();
    let server = TestServer::new(router(state)).unwrap();

    let (name, value) = key_header(KEY);
    let response = server
        .post("/api/extract-base64")
        .add_header(name, value)
        .json(&json!({ "pdf_base64": STANDARD.encode(profile_pdf()) }))
        .await;

    response.assert_status(StatusCode::REQUEST_TIMEOUT);
    let json = response.json::<Value>();
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "TIMEOUT");
    assert_eq!(json["error"], "Extraction timeout after 1s");
}

#[tokio::test]
async fn test_unauthorized_before_size_check() {
    let server = create_test_server_with(ServerConfig {
        max_body_bytes: 16,
        ..ServerConfig::default()
    });
    let response = server
        .post("/api/extract-base64")
        .json(&json!({ "pdf_base64": STANDARD.encode(vec![b'A'; 4096]) }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}
