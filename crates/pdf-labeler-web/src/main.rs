//! PDF Labeler Web - Web server for stamping labels onto PDF documents.

mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use clap::Parser;
use pdf_labeler_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use state::AppState;

/// Room for multipart framing and text fields on top of the file bytes.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Parser, Debug)]
#[command(name = "pdf-labeler-web")]
#[command(author, version, about = "PDF Labeler Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Upload limit in MiB (overrides the config file)
    #[arg(long, env = "MAX_UPLOAD_MB")]
    max_upload_mb: Option<usize>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Build the application router.
fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/process", post(routes::process_files))
        // Responses are per-request results; never let a browser reuse them
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = match args.config {
        Some(ref path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load(),
    };
    if let Some(mb) = args.max_upload_mb {
        config.max_upload_bytes = mb
            .checked_mul(1024 * 1024)
            .context("--max-upload-mb is too large")?;
    }

    info!(
        "Label defaults: {:?} at {}, size {}, color {}; upload limit {} bytes",
        config.label.text,
        config.label.position,
        config.label.font_size,
        config.label.color,
        config.max_upload_bytes
    );

    let state = Arc::new(AppState::new(config));
    let app = app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid host or port")?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
