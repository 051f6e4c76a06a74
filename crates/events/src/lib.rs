//! Tokenq event bus.
//!
//! Provides the in-process publish/subscribe hub used for ephemeral
//! fan-out: operator announcements and admission notifications. Events
//! are fire-and-forget and never persisted.

pub mod bus;

pub use bus::{EventBus, QueueEvent};
