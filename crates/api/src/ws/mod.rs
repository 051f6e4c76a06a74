//! WebSocket infrastructure: connection manager, upgrade handler,
//! heartbeat, and the publisher task that pushes queue snapshots and
//! announcements to every connected client.

pub mod handler;
pub mod heartbeat;
pub mod manager;
pub mod publisher;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
pub use publisher::start_publisher;
