//! REST API for load-flow results and what-if scenarios.
//!
//! Provides three endpoints:
//! - `GET /api/health`: static case reference and frequency
//! - `GET /api/results`: cached summary, computed on first use
//! - `POST /api/run`: solve a scaled scenario and replace the cached summary

mod error;
mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::ResultCache;
use crate::runner::LoadFlowRunner;

pub use error::ApiError;
pub use types::{ErrorResponse, HealthResponse};

/// State shared across all request handlers.
///
/// The cache is the only mutable part; it guards itself.
pub struct AppState {
    /// Case loading, solving and summarising.
    pub runner: LoadFlowRunner,
    /// Most recent summary.
    pub cache: ResultCache,
}

impl AppState {
    pub fn new(runner: LoadFlowRunner) -> Self {
        Self {
            runner,
            cache: ResultCache::new(),
        }
    }
}

/// Credentialed CORS for an explicit origin list, mirroring any requested
/// method and headers.
pub fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `origins` - Origins allowed for cross-origin requests
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>, origins: Vec<HeaderValue>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/results", get(handlers::get_results))
        .route("/api/run", post(handlers::run_scenario))
        .with_state(state)
        .layer(cors_layer(origins))
        .layer(TraceLayer::new_for_http())
}

/// Binds to the given address and serves the API until `shutdown` resolves.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve<F>(app: Router, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
