//! `replan serve` -- HTTP JSON API over the schedule editor.
//!
//! Optional API key authentication via the `REPLAN_API_KEY` env var.
//!
//! Endpoints:
//! - GET    /health                      - Server status (exempt from auth)
//! - GET    /schedules                   - List schedule ids
//! - GET    /schedules/{id}              - Current schedule and version
//! - POST   /schedules/{id}/proposals    - Validate patches, store a proposal
//! - POST   /resolve                     - Resolve a date phrase
//! - GET    /proposals/{id}              - Read a pending proposal
//! - DELETE /proposals/{id}              - Discard a pending proposal
//! - POST   /proposals/{id}/commit       - Apply a proposal
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_commit, handle_discard, handle_get_proposal, handle_get_schedule, handle_health,
    handle_list_schedules, handle_not_found, handle_propose, handle_resolve,
};
use self::middleware::auth_middleware;
use self::state::AppState;
use crate::Editor;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/schedules", get(handle_list_schedules))
        .route("/schedules/{id}", get(handle_get_schedule))
        .route("/schedules/{id}/proposals", post(handle_propose))
        .route("/resolve", post(handle_resolve))
        .route(
            "/proposals/{id}",
            get(handle_get_proposal).delete(handle_discard),
        )
        .route("/proposals/{id}/commit", post(handle_commit))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server on the given port.
///
/// If `REPLAN_API_KEY` is set, every endpoint except /health requires it.
pub async fn start_server(port: u16, editor: Editor) -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("REPLAN_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());

    if api_key.is_some() {
        eprintln!("API key authentication enabled");
    }

    let state = Arc::new(AppState { editor, api_key });
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("replan listening on http://0.0.0.0:{}", port);
    tracing::info!(port, "server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived shutdown signal...");
}
