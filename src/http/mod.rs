//! Axum-based HTTP channel for the classification service.
//!
//! ## URL layout
//!
//! ```text
//! POST /classify   { "text": ... } → { "text", "predicted_label", "confidence" }
//! GET  /health                     → { "status", "config_loaded", "num_labels" }
//! ```
//!
//! [`serve`] drives the axum event loop until the [`CancellationToken`] is
//! cancelled, then shuts down gracefully.

mod api;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::service::ClassifierContext;

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — the context is reference-counted.
#[derive(Clone)]
pub(crate) struct AppState {
    pub ctx: Arc<ClassifierContext>,
}

/// Bind `bind_addr` and serve until `shutdown` is cancelled.
pub async fn serve(
    bind_addr: &str,
    ctx: Arc<ClassifierContext>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Http(format!("bind failed on {bind_addr}: {e}")))?;

    serve_on(listener, ctx, shutdown).await
}

/// Serve on an already-bound listener. Tests bind port 0 and use this.
pub async fn serve_on(
    listener: TcpListener,
    ctx: Arc<ClassifierContext>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::Http(format!("listener address: {e}")))?;
    info!(%local_addr, "http listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Http(format!("server error: {e}")))?;

    info!("http shut down");
    Ok(())
}

/// Build the service router around a ready context.
///
/// Request bodies are not size-capped; text length is the engine's concern.
pub fn router(ctx: Arc<ClassifierContext>) -> Router {
    Router::new()
        .route("/classify", post(api::classify))
        .route("/health",   get(api::health))
        .layer(DefaultBodyLimit::disable())
        .with_state(AppState { ctx })
}
