//! Loi 96 API Server - Backend for document compliance analysis
//!
//! Provides REST endpoints for:
//! - Document and signage compliance analysis
//! - Analysis history (list, fetch, delete)
//! - Usage/quota reporting
//!
//! Authentication mechanics live upstream; requests arrive with an
//! `x-user-id` header set by the identity proxy.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

mod error;
mod handlers;
mod inference;
mod models;
mod state;
mod store;

use state::AppState;

/// Command-line arguments for the Loi 96 API server
#[derive(Parser, Debug)]
#[command(name = "loi96-api")]
#[command(about = "Loi 96 compliance analysis API server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3002")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Inference model identifier
    #[arg(long, default_value = "claude-sonnet-4-5")]
    model: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("loi96_api={default_level}").parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Initializing Loi 96 API...");
    let state = AppState::new(&args.model).await?;
    let state = Arc::new(state);

    // Periodic sweep keeps the in-process rate-limit map bounded.
    let sweeper = state.counter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let evicted = sweeper.sweep(Utc::now().timestamp_millis());
            if evicted > 0 {
                tracing::debug!(evicted, "evicted expired rate-limit windows");
            }
        }
    });

    let app = router(state);

    let addr = SocketAddr::new(args.host.parse()?, args.port);
    info!("Starting Loi 96 API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router over shared state.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Analysis endpoints
        .route("/api/analyze", post(handlers::analyze_document))
        .route("/api/analyze/signage", post(handlers::analyze_signage))
        // History
        .route("/api/analyses", get(handlers::list_analyses))
        .route("/api/analyses/:id", get(handlers::get_analysis))
        .route("/api/analyses/:id", delete(handlers::delete_analysis))
        // Quota
        .route("/api/usage", get(handlers::get_usage))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
