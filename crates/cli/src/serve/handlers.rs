//! HTTP route handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use replan_core::{ProposalId, ProposedPatch};
use replan_engine::{CommitError, ProposalError, ProposeError};
use replan_storage::{ScheduleStorage, StorageError};
use time::Date;

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// GET /schedules
pub(crate) async fn handle_list_schedules(State(state): State<Arc<AppState>>) -> Response {
    match state.editor.storage().list_schedules().await {
        Ok(ids) => (StatusCode::OK, Json(serde_json::json!({ "schedules": ids }))).into_response(),
        Err(e) => storage_error(&e),
    }
}

/// GET /schedules/{id}
pub(crate) async fn handle_get_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.editor.schedule(&id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => storage_error(&e),
    }
}

/// POST /resolve
///
/// Body: `{"phrase": "...", "schedule_id"?: "...", "anchor"?: "YYYY-MM-DD",
/// "today"?: "YYYY-MM-DD"}`. An ambiguous phrase is a successful response
/// carrying the clarification question.
pub(crate) async fn handle_resolve(
    State(state): State<Arc<AppState>>,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let phrase = match parsed.get("phrase").and_then(|v| v.as_str()) {
        Some(p) => p.to_string(),
        None => {
            return json_error(StatusCode::BAD_REQUEST, "missing 'phrase' field").into_response()
        }
    };

    let today = match optional_date(&parsed, "today") {
        Ok(d) => d.unwrap_or_else(|| state.editor.today()),
        Err(resp) => return resp,
    };
    let explicit_anchor = match optional_date(&parsed, "anchor") {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let schedule_id = parsed.get("schedule_id").and_then(|v| v.as_str());

    let anchor = match explicit_anchor {
        Some(a) => Some(a),
        None => match state.editor.anchor_of(schedule_id).await {
            Ok(a) => a,
            Err(e) => return storage_error(&e),
        },
    };

    match state.editor.resolve_on(&phrase, today, anchor) {
        Ok(resolution) => {
            let mut value = match serde_json::to_value(&resolution) {
                Ok(v) => v,
                Err(e) => {
                    return json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &format!("serialization error: {}", e),
                    )
                    .into_response()
                }
            };
            if let Some(obj) = value.as_object_mut() {
                obj.insert("phrase".to_string(), serde_json::json!(phrase));
            }
            (StatusCode::OK, Json(value)).into_response()
        }
        Err(e) => json_error(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()).into_response(),
    }
}

/// POST /schedules/{id}/proposals
///
/// Body: `{"patches": [...]}`. A rejected set returns 422 with the full
/// rejection report; nothing is stored.
pub(crate) async fn handle_propose(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let patches = match parsed.get("patches") {
        Some(p) => p.clone(),
        None => {
            return json_error(StatusCode::BAD_REQUEST, "missing 'patches' field").into_response()
        }
    };
    let drafts: Vec<ProposedPatch> = match serde_json::from_value(patches) {
        Ok(d) => d,
        Err(e) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                &format!("invalid 'patches': {}", e),
            )
            .into_response()
        }
    };

    match state.editor.propose(&id, &drafts).await {
        Ok(proposal) => (StatusCode::CREATED, Json(proposal)).into_response(),
        Err(ProposeError::Rejected(report)) => {
            let body = serde_json::json!({
                "error": "patch set rejected",
                "report": report,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
        Err(ProposeError::Storage(e)) => storage_error(&e),
    }
}

/// GET /proposals/{id}
pub(crate) async fn handle_get_proposal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.editor.proposal(&ProposalId::from(id)).await {
        Ok(proposal) => (StatusCode::OK, Json(proposal)).into_response(),
        Err(e) => proposal_error(&e),
    }
}

/// DELETE /proposals/{id}
pub(crate) async fn handle_discard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id = ProposalId::from(id);
    match state.editor.discard(&id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "discarded": id }))).into_response(),
        Err(e) => proposal_error(&e),
    }
}

/// POST /proposals/{id}/commit
///
/// Body: `{"version": N}`, the schedule version the caller reviewed.
pub(crate) async fn handle_commit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(parsed): Json<serde_json::Value>,
) -> Response {
    let version = match parsed.get("version").and_then(|v| v.as_u64()) {
        Some(v) => v,
        None => {
            return json_error(StatusCode::BAD_REQUEST, "missing 'version' field").into_response()
        }
    };

    match state.editor.commit(&ProposalId::from(id), version).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(CommitError::Rejected(report)) => {
            let body = serde_json::json!({
                "error": "patch set rejected",
                "report": report,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
        Err(CommitError::Storage(e)) => storage_error(&e),
        Err(e) => {
            let status = match &e {
                CommitError::NotFound { .. } => StatusCode::NOT_FOUND,
                CommitError::Expired { .. } => StatusCode::GONE,
                CommitError::Conflict { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            json_error(status, &e.to_string()).into_response()
        }
    }
}

fn optional_date(parsed: &serde_json::Value, field: &str) -> Result<Option<Date>, Response> {
    match parsed.get(field).and_then(|v| v.as_str()) {
        Some(raw) => crate::parse_date(raw).map(Some).map_err(|e| {
            json_error(StatusCode::BAD_REQUEST, &format!("invalid '{}': {}", field, e))
                .into_response()
        }),
        None => Ok(None),
    }
}

fn proposal_error(e: &ProposalError) -> Response {
    match e {
        ProposalError::NotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, &e.to_string()).into_response()
        }
        ProposalError::Expired { .. } => {
            json_error(StatusCode::GONE, &e.to_string()).into_response()
        }
        ProposalError::Storage(inner) => storage_error(inner),
    }
}

fn storage_error(e: &StorageError) -> Response {
    let status = match e {
        StorageError::ScheduleNotFound { .. } | StorageError::ProposalNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        StorageError::InvalidId { .. } => StatusCode::BAD_REQUEST,
        StorageError::ConcurrentConflict { .. } | StorageError::AlreadyInitialized { .. } => {
            StatusCode::CONFLICT
        }
        _ => {
            tracing::error!(error = %e, "storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, &e.to_string()).into_response()
}
