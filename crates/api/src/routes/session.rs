//! Session bootstrap: login, logout, profile.
//!
//! Role is self-asserted by the client and never verified; see the
//! module docs in [`crate::session`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokenq_core::{Role, UserSession};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::session::CurrentSession;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for POST /session/login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub role: Role,
}

/// Request body for PUT /session/profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

/// Response for login: the bearer token plus the minted session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub session: UserSession,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /session/login
///
/// Mint a session with a fresh user id and the claimed role.
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let session = UserSession::new(input.name, input.email, input.role);
    let token = state.sessions.create(session.clone()).await;

    tracing::info!(user_id = %session.id, role = session.role.as_str(), "Session created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SessionResponse { token, session },
        }),
    ))
}

/// POST /session/logout
async fn logout(
    current: CurrentSession,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.sessions.remove(&current.token).await;
    tracing::info!(user_id = %current.session.id, "Session dropped");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /session
async fn me(current: CurrentSession) -> Json<DataResponse<UserSession>> {
    Json(DataResponse {
        data: current.session,
    })
}

/// PUT /session/profile
///
/// Update the display name and email; user id and role are fixed for
/// the session's lifetime.
async fn update_profile(
    current: CurrentSession,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let session = state
        .sessions
        .update_profile(&current.token, input.name, input.email)
        .await
        .ok_or_else(|| AppError::Unauthorized("unknown session token".into()))?;

    Ok(Json(DataResponse { data: session }))
}

/// Routes mounted at `/session`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/", get(me))
        .route("/profile", put(update_profile))
}
