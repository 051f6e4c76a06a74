//! Atomic batch writes.
//!
//! A [`Batch`] is the only way to mutate a store: a list of
//! document-level operations applied all-or-nothing, plus optional
//! [`BatchGuard`]s that compare the stored metadata record before
//! anything is applied. A failed guard aborts the whole batch with
//! `CoreError::Conflict`, which is how a losing concurrent operator
//! session learns its snapshot was stale.

use tokenq_core::types::{EntryId, Timestamp};
use tokenq_core::{QueueEntry, QueueMetadata, QueueStatus};

/// One document-level mutation.
#[derive(Debug, Clone)]
pub enum BatchOp {
    CreateEntry(QueueEntry),
    UpdateEntry { id: EntryId, patch: EntryPatch },
    DeleteEntry(EntryId),
    SetMetadata(QueueMetadata),
}

/// Partial update for a queue entry. Unset fields are left unchanged.
///
/// `position` is doubly optional because "set to null" (leaving the
/// line) is distinct from "leave as-is". Tokens and `served_at` are
/// write-once, so they only ever move from null to a value.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub status: Option<QueueStatus>,
    pub token_number: Option<i64>,
    pub position: Option<Option<i32>>,
    pub served_at: Option<Timestamp>,
}

impl EntryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: QueueStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn token_number(mut self, token: i64) -> Self {
        self.token_number = Some(token);
        self
    }

    pub fn position(mut self, position: i32) -> Self {
        self.position = Some(Some(position));
        self
    }

    pub fn clear_position(mut self) -> Self {
        self.position = Some(None);
        self
    }

    pub fn served_at(mut self, at: Timestamp) -> Self {
        self.served_at = Some(at);
        self
    }

    /// Apply this patch to an entry in place.
    pub fn apply_to(&self, entry: &mut QueueEntry) {
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(token) = self.token_number {
            entry.token_number = Some(token);
        }
        if let Some(position) = self.position {
            entry.position = position;
        }
        if let Some(at) = self.served_at {
            entry.served_at = Some(at);
        }
    }
}

/// Precondition on the stored metadata record, checked atomically with
/// the batch. Mismatch aborts the batch without applying anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchGuard {
    /// The stored `last_token_number` must equal this value.
    LastTokenIs(i64),
    /// The stored `current_serving_token` must equal this value.
    ServingTokenIs(Option<i64>),
}

impl BatchGuard {
    /// Evaluate the guard against a metadata record.
    pub fn holds_for(&self, metadata: &QueueMetadata) -> bool {
        match *self {
            BatchGuard::LastTokenIs(token) => metadata.last_token_number == token,
            BatchGuard::ServingTokenIs(token) => metadata.current_serving_token == token,
        }
    }
}

/// An all-or-nothing set of mutations.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub ops: Vec<BatchOp>,
    pub guards: Vec<BatchGuard>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(mut self, entry: QueueEntry) -> Self {
        self.ops.push(BatchOp::CreateEntry(entry));
        self
    }

    pub fn update(mut self, id: EntryId, patch: EntryPatch) -> Self {
        self.ops.push(BatchOp::UpdateEntry { id, patch });
        self
    }

    pub fn delete(mut self, id: EntryId) -> Self {
        self.ops.push(BatchOp::DeleteEntry(id));
        self
    }

    pub fn set_metadata(mut self, metadata: QueueMetadata) -> Self {
        self.ops.push(BatchOp::SetMetadata(metadata));
        self
    }

    pub fn guard(mut self, guard: BatchGuard) -> Self {
        self.guards.push(guard);
        self
    }
}
