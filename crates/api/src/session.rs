//! Self-asserted session registry and extractors.
//!
//! Identity here is bootstrap, not security: a client logs in with a
//! name, an email and a claimed role, receives an opaque bearer token,
//! and presents it on subsequent requests. Nothing is verified; the
//! registry only gives each browser session a stable user id and lets
//! the operator panel gate on the claimed role.

use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tokio::sync::RwLock;
use tokenq_core::{Role, UserSession};

use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// In-memory session registry.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc`
/// and shared across the application. Sessions live until logout or
/// process restart.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, UserSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session and return its opaque bearer token.
    pub async fn create(&self, session: UserSession) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    /// Look up the session behind a token.
    pub async fn get(&self, token: &str) -> Option<UserSession> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Update name and email on an existing session.
    ///
    /// Returns the updated session, or `None` if the token is unknown.
    pub async fn update_profile(
        &self,
        token: &str,
        name: String,
        email: String,
    ) -> Option<UserSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(token)?;
        session.name = name;
        session.email = email;
        Some(session.clone())
    }

    /// Drop a session. Returns whether the token was known.
    pub async fn remove(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Extractor for any authenticated session (user or admin).
pub struct CurrentSession {
    /// The bearer token the session was presented with.
    pub token: String,
    pub session: UserSession,
}

/// Extractor that additionally requires the self-asserted admin role.
pub struct RequireAdmin(pub UserSession);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer session token".into()))?
            .to_string();
        let session = state
            .sessions
            .get(&token)
            .await
            .ok_or_else(|| AppError::Unauthorized("unknown session token".into()))?;
        Ok(CurrentSession { token, session })
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentSession::from_request_parts(parts, state).await?;
        if current.session.role != Role::Admin {
            return Err(AppError::Forbidden(
                "operator role required for this action".into(),
            ));
        }
        Ok(RequireAdmin(current.session))
    }
}
