use std::sync::Arc;

use tokenq_engine::QueueEngine;
use tokenq_events::EventBus;
use tokenq_store::QueueStore;

use crate::config::ServerConfig;
use crate::session::SessionManager;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The queue engine; the only path that mutates the store.
    pub engine: Arc<QueueEngine>,
    /// The store itself, for health checks.
    pub store: Arc<dyn QueueStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Self-asserted session registry.
    pub sessions: Arc<SessionManager>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Ephemeral event bus (announcements, admission notifications).
    pub event_bus: Arc<EventBus>,
}
