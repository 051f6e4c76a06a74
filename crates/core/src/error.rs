use crate::status::QueueStatus;
use crate::types::EntryId;

/// Error taxonomy shared by the store, the engine, and the API layer.
///
/// Every variant is recoverable: the engine declines to mutate state and
/// reports the reason; nothing here should abort the process.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: EntryId },

    #[error("User already has an active queue entry")]
    AlreadyQueued,

    #[error("Invalid transition: cannot {action} an entry in status '{from}'")]
    InvalidTransition {
        action: &'static str,
        from: QueueStatus,
    },

    #[error("Queue empty: no approved entries to call")]
    QueueEmpty,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
