use async_trait::async_trait;
use tokio::sync::watch;
use tokenq_core::{CoreError, QueueEntry, QueueMetadata};

use crate::batch::Batch;

/// The store contract consumed by the queue engine.
///
/// Subscriptions deliver full snapshots on every change; subscribers
/// replace their materialized view wholesale and never diff. `commit`
/// applies a batch atomically: either every operation takes effect and
/// a new snapshot is published, or none do.
///
/// The store serializes batches against each other, but makes no
/// cross-caller ordering promises beyond that -- two operator sessions
/// racing on stale snapshots are arbitrated by the batch guards.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Subscribe to the entries collection, ordered by `created_at`
    /// ascending. The receiver always holds the latest snapshot.
    fn subscribe_entries(&self) -> watch::Receiver<Vec<QueueEntry>>;

    /// Subscribe to the singleton metadata record.
    fn subscribe_metadata(&self) -> watch::Receiver<QueueMetadata>;

    /// Apply a batch atomically. Guard mismatch yields
    /// `CoreError::Conflict`; an update targeting a missing entry
    /// yields `CoreError::NotFound`; neither applies any part of the
    /// batch.
    async fn commit(&self, batch: Batch) -> Result<(), CoreError>;

    /// Whether the backing transport is reachable.
    async fn healthy(&self) -> bool;
}
