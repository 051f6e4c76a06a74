//! Queue operations: snapshot read, join, and the operator actions.
//!
//! Reads require any session; mutations other than join require the
//! (self-asserted) admin role.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokenq_core::types::EntryId;
use tokenq_core::QueueSnapshot;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::session::{CurrentSession, RequireAdmin};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for POST /queue/join.
///
/// Name and email arrive from the join form; only the name is recorded
/// on the entry. Identity is the session's user id.
#[derive(Debug, Deserialize, Validate)]
pub struct JoinRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

/// Request body for POST /queue/broadcast.
#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 500))]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /queue
///
/// The current materialized snapshot: all entries (ordered by creation)
/// plus the metadata record.
async fn get_queue(
    _session: CurrentSession,
    State(state): State<AppState>,
) -> Json<DataResponse<QueueSnapshot>> {
    Json(DataResponse {
        data: state.engine.snapshot(),
    })
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// POST /queue/join
///
/// Create a pending entry for the current session's user.
async fn join(
    current: CurrentSession,
    State(state): State<AppState>,
    Json(input): Json<JoinRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let entry = state.engine.join(current.session.id, &input.name).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

// ---------------------------------------------------------------------------
// Operator actions
// ---------------------------------------------------------------------------

/// POST /queue/{id}/approve
async fn approve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(entry_id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let entry = state.engine.approve_request(entry_id).await?;
    tracing::info!(entry_id = %entry_id, admin = %admin.id, "Entry approved by operator");
    Ok(Json(DataResponse { data: entry }))
}

/// POST /queue/{id}/reject
async fn reject(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(entry_id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let entry = state.engine.reject_request(entry_id).await?;
    tracing::info!(entry_id = %entry_id, admin = %admin.id, "Entry rejected by operator");
    Ok(Json(DataResponse { data: entry }))
}

/// POST /queue/call-next
async fn call_next(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let entry = state.engine.call_next().await?;
    tracing::info!(
        token = ?entry.token_number,
        admin = %admin.id,
        "Serving pointer advanced",
    );
    Ok(Json(DataResponse { data: entry }))
}

/// POST /queue/{id}/skip
async fn skip(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(entry_id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let entry = state.engine.skip_token(entry_id).await?;
    tracing::info!(entry_id = %entry_id, admin = %admin.id, "Entry skipped by operator");
    Ok(Json(DataResponse { data: entry }))
}

/// POST /queue/reset
async fn reset(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.engine.reset_queue().await?;
    tracing::info!(admin = %admin.id, "Queue reset by operator");
    Ok(Json(DataResponse {
        data: json!({ "cleared": true }),
    }))
}

/// POST /queue/broadcast
async fn broadcast(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BroadcastRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.engine.broadcast_message(&input.message)?;
    tracing::info!(admin = %admin.id, "Announcement broadcast");
    Ok(Json(DataResponse {
        data: json!({ "sent": true }),
    }))
}

/// Routes mounted at `/queue`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_queue))
        .route("/join", post(join))
        .route("/call-next", post(call_next))
        .route("/reset", post(reset))
        .route("/broadcast", post(broadcast))
        .route("/{id}/approve", post(approve))
        .route("/{id}/reject", post(reject))
        .route("/{id}/skip", post(skip))
}
