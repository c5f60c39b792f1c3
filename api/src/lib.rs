//! HTTP surface: upload a PDF, chat about it over SSE.

use std::sync::Arc;

mod core;
mod error_handler;
mod middleware_layer;
mod routes;

pub use crate::core::app_state::{ApiConfig, AppState, ConfigError};
pub use crate::error_handler::{AppError, AppResult};
pub use crate::routes::chat::chat_route::SESSION_HEADER;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tokio::signal;
use tracing::{info, warn};

use crate::middleware_layer::json_extractor::json_error_mapper;
use crate::routes::{
    chat::{ask_route::ask_route, chat_route::chat_route},
    health::health_route::health_route,
    sessions::session_route::reset_session_route,
    upload::upload_route::upload_route,
};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/upload",
            post(upload_route).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/chat", post(chat_route))
        .route("/ask", post(ask_route))
        .route("/sessions/{id}", delete(reset_session_route))
        .route("/health", get(health_route))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

/// Loads configuration from the environment and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let state = Arc::new(AppState::from_env()?);
    let evictor = state.spawn_session_evictor();
    let address = state.config.address.clone();

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %address, "listening");

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server);

    evictor.abort();
    info!("server stopped");
    result
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
