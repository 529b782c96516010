//! HTTP service: `POST /summarize`, `POST /test-save`, `GET /`.
//!
//! Requests are handled independently; there is no cross-request locking, so
//! two uploads for the same `documentID` race and the last write wins.

pub mod handlers;

use crate::error::DocsumError;
use crate::summarize::SummaryPipeline;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub pipeline: SummaryPipeline,
}

/// Build the router. The body limit comes from the pipeline's configuration.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.pipeline.config().max_upload_bytes);

    Router::new()
        .route("/", get(handlers::index))
        .route("/summarize", post(handlers::summarize))
        .route("/test-save", post(handlers::test_save))
        .layer(body_limit)
        .with_state(state)
}

/// Serve `pipeline` on `addr` until Ctrl-C.
pub async fn serve(pipeline: SummaryPipeline, addr: SocketAddr) -> Result<(), DocsumError> {
    let store_dir = pipeline.store().dir().to_path_buf();
    tokio::fs::create_dir_all(&store_dir)
        .await
        .map_err(|source| DocsumError::RecordWriteFailed {
            path: store_dir.clone(),
            source,
        })?;

    let app = router(Arc::new(AppState { pipeline }));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DocsumError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!(
        "Listening on http://{} (store: {})",
        addr,
        store_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| DocsumError::Internal(format!("server error: {e}")))
}
