//! Webhook handlers

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::state::AppState;
use crate::telegram::Update;

/// Body returned for anything but a POST
pub const POST_ONLY: &str = "This webhook only accepts POST requests.";

/// Receive one update from the messaging platform
///
/// The update is handled to completion before responding. Handling runs on
/// its own task so a panic inside it becomes a 500 instead of a dropped
/// connection.
pub async fn webhook(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Rejecting malformed update");
            return (StatusCode::BAD_REQUEST, "Bad Request");
        }
    };
    debug!(update_id = ?update.update_id, "Update received");

    run_to_completion(async move { state.router.handle(update).await }).await
}

/// Run update handling on its own task and map the outcome to a status
async fn run_to_completion<F>(handling: F) -> (StatusCode, &'static str)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::spawn(handling).await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            error!(error = %e, "Update handling failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Reject non-POST requests without treating them as errors
pub async fn reject_non_post() -> impl IntoResponse {
    (StatusCode::OK, POST_ONLY)
}
