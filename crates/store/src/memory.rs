//! In-process store backend.
//!
//! State lives behind a single `tokio::sync::RwLock`; every committed
//! batch publishes fresh snapshots on the watch channels while still
//! holding the write lock, so subscribers observe a monotone sequence
//! of consistent snapshots and batches are trivially serialized.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tokenq_core::types::EntryId;
use tokenq_core::{CoreError, QueueEntry, QueueMetadata};

use crate::batch::{Batch, BatchOp};
use crate::store::QueueStore;

struct MemoryState {
    entries: HashMap<EntryId, QueueEntry>,
    metadata: QueueMetadata,
}

/// Single-process [`QueueStore`] backend.
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    entries_tx: watch::Sender<Vec<QueueEntry>>,
    metadata_tx: watch::Sender<QueueMetadata>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (entries_tx, _) = watch::channel(Vec::new());
        let (metadata_tx, _) = watch::channel(QueueMetadata::default());
        Self {
            state: RwLock::new(MemoryState {
                entries: HashMap::new(),
                metadata: QueueMetadata::default(),
            }),
            entries_tx,
            metadata_tx,
        }
    }

    /// Snapshot the entries map in collection order (`created_at`
    /// ascending, entry id as a stable tie-break).
    fn snapshot_entries(state: &MemoryState) -> Vec<QueueEntry> {
        let mut entries: Vec<QueueEntry> = state.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        entries
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    fn subscribe_entries(&self) -> watch::Receiver<Vec<QueueEntry>> {
        self.entries_tx.subscribe()
    }

    fn subscribe_metadata(&self) -> watch::Receiver<QueueMetadata> {
        self.metadata_tx.subscribe()
    }

    async fn commit(&self, batch: Batch) -> Result<(), CoreError> {
        let mut state = self.state.write().await;

        for guard in &batch.guards {
            if !guard.holds_for(&state.metadata) {
                return Err(CoreError::Conflict(format!(
                    "metadata guard failed: {guard:?} against {:?}",
                    state.metadata
                )));
            }
        }

        // Validate every op against the current state before mutating,
        // so a failing batch leaves no partial application behind.
        for op in &batch.ops {
            if let BatchOp::UpdateEntry { id, .. } = op {
                if !state.entries.contains_key(id) {
                    return Err(CoreError::NotFound {
                        entity: "queue entry",
                        id: *id,
                    });
                }
            }
        }

        for op in batch.ops {
            match op {
                BatchOp::CreateEntry(entry) => {
                    state.entries.insert(entry.id, entry);
                }
                BatchOp::UpdateEntry { id, patch } => {
                    // Presence checked above.
                    if let Some(entry) = state.entries.get_mut(&id) {
                        patch.apply_to(entry);
                    }
                }
                BatchOp::DeleteEntry(id) => {
                    state.entries.remove(&id);
                }
                BatchOp::SetMetadata(metadata) => {
                    state.metadata = metadata;
                }
            }
        }

        self.entries_tx.send_replace(Self::snapshot_entries(&state));
        self.metadata_tx.send_replace(state.metadata);
        Ok(())
    }

    async fn healthy(&self) -> bool {
        true
    }
}
