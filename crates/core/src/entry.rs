//! Persisted queue records and the materialized snapshot view.

use serde::{Deserialize, Serialize};

use crate::status::QueueStatus;
use crate::types::{EntryId, Timestamp, UserId};

/// One user's visit record.
///
/// Created by `join` (status `pending`), mutated only by the engine's
/// transition operations, physically deleted only by a full reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Opaque unique identifier, assigned at creation, immutable.
    pub id: EntryId,
    /// Owning user. At most one entry per user may be active at a time.
    pub user_id: UserId,
    /// Display name captured at request time; never re-validated.
    pub user_name: String,
    pub status: QueueStatus,
    /// Null until approval; once assigned, permanent and never reused.
    pub token_number: Option<i64>,
    /// Rank in the waiting line; meaningful only while approved/serving
    /// (0 = being served now). Null otherwise.
    pub position: Option<i32>,
    /// Creation time; the only ordering key for the entries collection.
    pub created_at: Timestamp,
    /// Set exactly once on the serving -> served transition.
    pub served_at: Option<Timestamp>,
}

impl QueueEntry {
    /// Build a fresh pending entry for `join`.
    pub fn new_pending(user_id: UserId, user_name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id,
            user_name: user_name.into(),
            status: QueueStatus::Pending,
            token_number: None,
            position: None,
            created_at: chrono::Utc::now(),
            served_at: None,
        }
    }
}

/// The singleton metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMetadata {
    /// Highest token number ever issued. Never decreases except on reset.
    pub last_token_number: i64,
    /// Token of the unique serving entry, or null if none is serving.
    pub current_serving_token: Option<i64>,
}

impl Default for QueueMetadata {
    fn default() -> Self {
        Self {
            last_token_number: 0,
            current_serving_token: None,
        }
    }
}

/// The engine's materialized view of the store: the latest entries
/// snapshot (ordered by `created_at` ascending) plus the metadata record.
///
/// Replaced wholesale on every store notification; readers must treat it
/// as possibly stale relative to concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntry>,
    pub metadata: QueueMetadata,
}

impl QueueSnapshot {
    /// Look up an entry by id.
    pub fn entry(&self, id: EntryId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// The user's active entry (pending, approved or serving), if any.
    pub fn active_entry_for(&self, user_id: UserId) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .find(|e| e.user_id == user_id && e.status.is_active())
    }

    /// The unique serving entry, if any.
    pub fn serving_entry(&self) -> Option<&QueueEntry> {
        self.entries
            .iter()
            .find(|e| e.status == QueueStatus::Serving)
    }

    /// Approved entries ordered by token number ascending (the waiting
    /// line, head first). Approved entries always carry a token.
    pub fn approved_in_token_order(&self) -> Vec<&QueueEntry> {
        let mut approved: Vec<&QueueEntry> = self
            .entries
            .iter()
            .filter(|e| e.status == QueueStatus::Approved)
            .collect();
        approved.sort_by_key(|e| e.token_number.unwrap_or(0));
        approved
    }

    /// Count of entries currently admitted to the line (approved or
    /// serving). The next approval appends at this count + 1.
    pub fn admitted_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, QueueStatus::Approved | QueueStatus::Serving))
            .count()
    }
}
