pub mod health;
pub mod queue;
pub mod session;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /session/login       create session (public)
/// /session/logout      drop session
/// /session             current session
/// /session/profile     update name/email
///
/// /queue               materialized snapshot
/// /queue/join          request entry
/// /queue/call-next     advance serving pointer (admin)
/// /queue/reset         clear everything (admin)
/// /queue/broadcast     announce to all clients (admin)
/// /queue/{id}/approve  issue token (admin)
/// /queue/{id}/reject   refuse request (admin)
/// /queue/{id}/skip     skip an admitted entry (admin)
///
/// /ws                  live snapshot + announcement feed
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/session", session::router())
        .nest("/queue", queue::router())
        .route("/ws", get(ws::handler::ws_handler))
}
