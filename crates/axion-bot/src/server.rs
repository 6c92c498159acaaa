//! Web server setup and routing

use anyhow::Result;
use axum::{routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::state::AppState;

/// Build the webhook router
pub fn build_router(state: Arc<AppState>) -> Router {
    let path = state.config.server.webhook_path.clone();

    Router::new()
        .route(&path, post(api::webhook).fallback(api::reject_non_post))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the webhook server
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let path = state.config.server.webhook_path.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, path = %path, "Starting webhook server");
    axum::serve(listener, app).await?;
    Ok(())
}
