//! Queue state machine and transition operations.

use std::sync::Arc;

use tokio::sync::watch;
use tokenq_core::types::{EntryId, UserId};
use tokenq_core::{CoreError, QueueEntry, QueueMetadata, QueueSnapshot, QueueStatus};
use tokenq_events::{EventBus, QueueEvent};
use tokenq_store::{Batch, BatchGuard, EntryPatch, QueueStore};

/// The queue engine.
///
/// Holds the two store subscriptions and materializes them into a
/// [`QueueSnapshot`] on demand. Operations read the last-synchronized
/// snapshot -- which can be stale relative to a concurrent writer in
/// another process -- and commit their effects as one atomic batch.
/// Admission-affecting batches carry metadata guards so that a stale
/// writer loses with `CoreError::Conflict` instead of corrupting token
/// numbering or double-promoting; no operation retries internally.
pub struct QueueEngine {
    store: Arc<dyn QueueStore>,
    bus: Arc<EventBus>,
    entries: watch::Receiver<Vec<QueueEntry>>,
    metadata: watch::Receiver<QueueMetadata>,
}

impl QueueEngine {
    pub fn new(store: Arc<dyn QueueStore>, bus: Arc<EventBus>) -> Self {
        let entries = store.subscribe_entries();
        let metadata = store.subscribe_metadata();
        Self {
            store,
            bus,
            entries,
            metadata,
        }
    }

    /// The current materialized view: latest entries snapshot plus the
    /// metadata record.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            entries: self.entries.borrow().clone(),
            metadata: *self.metadata.borrow(),
        }
    }

    // -----------------------------------------------------------------
    // join
    // -----------------------------------------------------------------

    /// Request entry to the line. The only creation path.
    ///
    /// Refuses with [`CoreError::AlreadyQueued`] if the user already has
    /// a pending, approved or serving entry.
    pub async fn join(&self, user_id: UserId, display_name: &str) -> Result<QueueEntry, CoreError> {
        let snapshot = self.snapshot();
        if snapshot.active_entry_for(user_id).is_some() {
            return Err(CoreError::AlreadyQueued);
        }

        let entry = QueueEntry::new_pending(user_id, display_name);
        self.store
            .commit(Batch::new().create(entry.clone()))
            .await?;

        tracing::info!(entry_id = %entry.id, user = %entry.user_name, "Join request created");
        self.bus.publish(QueueEvent::EntryJoined {
            entry_id: entry.id,
            user_name: entry.user_name.clone(),
        });
        Ok(entry)
    }

    // -----------------------------------------------------------------
    // approve
    // -----------------------------------------------------------------

    /// Approve a pending request: issue the next sequential token and
    /// append the entry to the tail of the waiting line.
    ///
    /// The new position is `admitted count + 1` rather than a full
    /// recompute: tokens are monotonic, so a fresh approval can never
    /// land mid-queue. The batch rewrites the whole metadata record, so
    /// it is guarded on both observed fields: `last_token_number`
    /// (two concurrent approvals must not issue the same token) and
    /// `current_serving_token` (a concurrent `call_next` must not have
    /// its pointer advance silently overwritten).
    pub async fn approve_request(&self, entry_id: EntryId) -> Result<QueueEntry, CoreError> {
        let snapshot = self.snapshot();
        let entry = snapshot.entry(entry_id).ok_or(CoreError::NotFound {
            entity: "queue entry",
            id: entry_id,
        })?;
        if !entry.status.can_approve() {
            return Err(CoreError::InvalidTransition {
                action: "approve",
                from: entry.status,
            });
        }

        let new_token = snapshot.metadata.last_token_number + 1;
        let position = snapshot.admitted_count() as i32 + 1;
        let patch = EntryPatch::new()
            .status(QueueStatus::Approved)
            .token_number(new_token)
            .position(position);

        self.store
            .commit(
                Batch::new()
                    .update(entry_id, patch.clone())
                    .set_metadata(QueueMetadata {
                        last_token_number: new_token,
                        current_serving_token: snapshot.metadata.current_serving_token,
                    })
                    .guard(BatchGuard::LastTokenIs(snapshot.metadata.last_token_number))
                    .guard(BatchGuard::ServingTokenIs(
                        snapshot.metadata.current_serving_token,
                    )),
            )
            .await?;

        tracing::info!(entry_id = %entry_id, token = new_token, position, "Request approved");
        self.bus.publish(QueueEvent::EntryApproved {
            entry_id,
            token_number: new_token,
        });

        let mut approved = entry.clone();
        patch.apply_to(&mut approved);
        Ok(approved)
    }

    // -----------------------------------------------------------------
    // reject
    // -----------------------------------------------------------------

    /// Reject a pending request. No token is issued; position stays
    /// null.
    pub async fn reject_request(&self, entry_id: EntryId) -> Result<QueueEntry, CoreError> {
        let snapshot = self.snapshot();
        let entry = snapshot.entry(entry_id).ok_or(CoreError::NotFound {
            entity: "queue entry",
            id: entry_id,
        })?;
        if !entry.status.can_reject() {
            return Err(CoreError::InvalidTransition {
                action: "reject",
                from: entry.status,
            });
        }

        let patch = EntryPatch::new().status(QueueStatus::Rejected);
        self.store
            .commit(Batch::new().update(entry_id, patch.clone()))
            .await?;

        tracing::info!(entry_id = %entry_id, "Request rejected");
        let mut rejected = entry.clone();
        patch.apply_to(&mut rejected);
        Ok(rejected)
    }

    // -----------------------------------------------------------------
    // call next
    // -----------------------------------------------------------------

    /// Advance the serving pointer: promote the approved entry with the
    /// smallest token to serving, demote the previously serving entry
    /// (if any) to served, and close the gap in the waiting line.
    ///
    /// Applied as one batch. Like `approve_request` it rewrites the
    /// whole metadata record, so it is guarded on both observed fields:
    /// `current_serving_token` (two operators cannot double-promote)
    /// and `last_token_number` (a concurrent approval must not have its
    /// freshly issued token rolled back).
    pub async fn call_next(&self) -> Result<QueueEntry, CoreError> {
        let snapshot = self.snapshot();
        let approved = snapshot.approved_in_token_order();
        let Some(next) = approved.first() else {
            return Err(CoreError::QueueEmpty);
        };

        let promote = EntryPatch::new().status(QueueStatus::Serving).position(0);
        let mut batch = Batch::new().update(next.id, promote.clone());

        if let Some(current) = snapshot.serving_entry() {
            batch = batch.update(
                current.id,
                EntryPatch::new()
                    .status(QueueStatus::Served)
                    .clear_position()
                    .served_at(chrono::Utc::now()),
            );
        }

        // Everyone left waiting moves up one place. The floor is a
        // defensive clamp: under sequential operation positions are
        // already dense and never reach below 1 here.
        for waiting in approved.iter().skip(1) {
            let moved_up = (waiting.position.unwrap_or(1) - 1).max(0);
            batch = batch.update(waiting.id, EntryPatch::new().position(moved_up));
        }

        batch = batch
            .set_metadata(QueueMetadata {
                last_token_number: snapshot.metadata.last_token_number,
                current_serving_token: next.token_number,
            })
            .guard(BatchGuard::ServingTokenIs(
                snapshot.metadata.current_serving_token,
            ))
            .guard(BatchGuard::LastTokenIs(snapshot.metadata.last_token_number));

        self.store.commit(batch).await?;

        let token = next.token_number.unwrap_or(0);
        tracing::info!(entry_id = %next.id, token, "Calling next token");
        self.bus.publish(QueueEvent::TokenCalled {
            entry_id: next.id,
            token_number: token,
        });

        let mut serving = (*next).clone();
        promote.apply_to(&mut serving);
        Ok(serving)
    }

    // -----------------------------------------------------------------
    // skip
    // -----------------------------------------------------------------

    /// Skip an approved or serving entry.
    ///
    /// Touches only the one entry: `current_serving_token` and the
    /// other positions are left alone, unlike `call_next`. That matches
    /// the observed product behavior; see DESIGN.md before changing it.
    pub async fn skip_token(&self, entry_id: EntryId) -> Result<QueueEntry, CoreError> {
        let snapshot = self.snapshot();
        let entry = snapshot.entry(entry_id).ok_or(CoreError::NotFound {
            entity: "queue entry",
            id: entry_id,
        })?;
        if !entry.status.can_skip() {
            return Err(CoreError::InvalidTransition {
                action: "skip",
                from: entry.status,
            });
        }

        let patch = EntryPatch::new()
            .status(QueueStatus::Skipped)
            .clear_position();
        self.store
            .commit(Batch::new().update(entry_id, patch.clone()))
            .await?;

        tracing::info!(entry_id = %entry_id, token = ?entry.token_number, "Token skipped");
        let mut skipped = entry.clone();
        patch.apply_to(&mut skipped);
        Ok(skipped)
    }

    // -----------------------------------------------------------------
    // reset
    // -----------------------------------------------------------------

    /// Delete every entry and zero the metadata record. Irreversible.
    pub async fn reset_queue(&self) -> Result<(), CoreError> {
        let snapshot = self.snapshot();
        let mut batch = Batch::new();
        for entry in &snapshot.entries {
            batch = batch.delete(entry.id);
        }
        batch = batch.set_metadata(QueueMetadata::default());

        self.store.commit(batch).await?;

        tracing::info!(deleted = snapshot.entries.len(), "Queue reset");
        self.bus.publish(QueueEvent::QueueReset);
        Ok(())
    }

    // -----------------------------------------------------------------
    // broadcast
    // -----------------------------------------------------------------

    /// Fan an announcement out to observers. No persisted effect.
    pub fn broadcast_message(&self, message: &str) -> Result<(), CoreError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(CoreError::Validation(
                "announcement message must not be empty".into(),
            ));
        }
        tracing::info!(message, "Broadcasting announcement");
        self.bus.publish(QueueEvent::announcement(message));
        Ok(())
    }
}
