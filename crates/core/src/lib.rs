//! Domain types and pure rules for the tokenq service queue.
//!
//! This crate is I/O-free: it defines the queue entry lifecycle
//! ([`QueueStatus`]), the persisted records ([`QueueEntry`],
//! [`QueueMetadata`]), the materialized view ([`QueueSnapshot`]),
//! self-asserted identity ([`UserSession`]), and the shared error
//! taxonomy ([`CoreError`]). All state mutation lives in
//! `tokenq-engine`; all persistence lives in `tokenq-store`.

pub mod entry;
pub mod error;
pub mod session;
pub mod status;
pub mod types;

pub use entry::{QueueEntry, QueueMetadata, QueueSnapshot};
pub use error::CoreError;
pub use session::{Role, UserSession};
pub use status::QueueStatus;
