use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::ws::WsManager;

/// Ping interval. Keeps intermediaries from reaping idle connections.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn the heartbeat task that pings all WebSocket connections on a
/// fixed interval.
pub fn start_heartbeat(manager: Arc<WsManager>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        // The first tick fires immediately; skip it.
        interval.tick().await;

        loop {
            interval.tick().await;
            manager.ping_all().await;
            let count = manager.connection_count().await;
            if count > 0 {
                tracing::trace!(count, "Heartbeat ping sent");
            }
        }
    })
}
