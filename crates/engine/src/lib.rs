//! The queue engine: the state machine behind the service line.
//!
//! [`QueueEngine`] owns the materialized view of the store (replaced
//! wholesale on every snapshot delivery) and exposes the fixed set of
//! mutating operations: join, approve, reject, call-next, skip, reset,
//! broadcast. All mutation goes through atomic store batches; the
//! engine itself holds no authoritative state.

pub mod engine;

pub use engine::QueueEngine;
