//! pdfprobe HTTP server
//!
//! Wraps the extractor behind a small REST API:
//!
//! - `POST /api/extract` for multipart PDF uploads
//! - `POST /api/extract-base64` for base64 JSON submissions
//! - `GET /` and `GET /health` for health checks
//!
//! Every `/api` request must carry the configured `X-API-Key`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pdfprobe_core::ProbeConfig;

mod api;
mod error;
mod state;
#[cfg(test)]
mod tests;

use state::AppState;

/// Command-line arguments for the pdfprobe server
#[derive(Parser, Debug)]
#[command(name = "pdfprobe-server")]
#[command(about = "HTTP service for PDF text extraction and profile photo detection")]
struct Args {
    /// Port to listen on (overrides PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,

    /// API key required in X-API-Key (overrides PDF_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProbeConfig::load(args.config.as_deref())?;
    let mut server = config.server;

    // Precedence: flags, then environment, then config file
    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
        server.port = port;
    }
    if let Ok(key) = std::env::var("PDF_API_KEY") {
        server.api_key = Some(key);
    }
    if let Some(port) = args.port {
        server.port = port;
    }
    if let Some(host) = args.host {
        server.host = host;
    }
    if let Some(key) = args.api_key {
        server.api_key = Some(key);
    }

    let Some(api_key) = server.api_key.clone().filter(|k| !k.is_empty()) else {
        anyhow::bail!("No API key configured. Set PDF_API_KEY, pass --api-key or set server.api_key");
    };

    let state = AppState::new(api_key, config.pdf, &server);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!(
        "Body limit: {} bytes, {} concurrent extractions, {}s timeout",
        server.max_body_bytes, server.max_concurrent_extractions, server.extraction_timeout_secs
    );

    axum::serve(listener, app).await?;

    Ok(())
}
