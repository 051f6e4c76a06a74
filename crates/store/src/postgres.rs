//! PostgreSQL store backend.
//!
//! Batches run inside a single transaction; guard evaluation locks the
//! metadata row (`SELECT ... FOR UPDATE`) so concurrent committers are
//! serialized at the database and the losing stale writer gets a
//! conflict instead of corrupting token numbering.
//!
//! Change fan-out: after each local commit the snapshot is re-queried
//! and published on the watch channels. A background poll task does the
//! same on an interval to pick up writes from other processes sharing
//! the database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokenq_core::{CoreError, QueueEntry, QueueMetadata, QueueStatus};
use uuid::Uuid;

use crate::batch::{Batch, BatchOp};
use crate::store::QueueStore;

/// Column list shared across queries to avoid repetition.
const ENTRY_COLUMNS: &str =
    "id, user_id, user_name, status, token_number, line_position, created_at, served_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `queue_entries` table. Status is stored as text and
/// parsed at the edge.
#[derive(Debug, FromRow)]
struct EntryRow {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    status: String,
    token_number: Option<i64>,
    line_position: Option<i32>,
    created_at: DateTime<Utc>,
    served_at: Option<DateTime<Utc>>,
}

impl TryFrom<EntryRow> for QueueEntry {
    type Error = CoreError;

    fn try_from(row: EntryRow) -> Result<Self, CoreError> {
        let status = QueueStatus::parse(&row.status).map_err(CoreError::Internal)?;
        Ok(QueueEntry {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            status,
            token_number: row.token_number,
            position: row.line_position,
            created_at: row.created_at,
            served_at: row.served_at,
        })
    }
}

/// The singleton row from `queue_metadata`.
#[derive(Debug, FromRow)]
struct MetadataRow {
    last_token_number: i64,
    current_serving_token: Option<i64>,
}

impl From<MetadataRow> for QueueMetadata {
    fn from(row: MetadataRow) -> Self {
        Self {
            last_token_number: row.last_token_number,
            current_serving_token: row.current_serving_token,
        }
    }
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// PostgreSQL-backed [`QueueStore`].
pub struct PgStore {
    pool: PgPool,
    entries_tx: watch::Sender<Vec<QueueEntry>>,
    metadata_tx: watch::Sender<QueueMetadata>,
}

impl PgStore {
    /// Connect the store: perform the initial snapshot load and spawn
    /// the poll task. The task runs until `cancel` is cancelled.
    pub async fn connect(
        pool: PgPool,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>, CoreError> {
        let (entries_tx, _) = watch::channel(Vec::new());
        let (metadata_tx, _) = watch::channel(QueueMetadata::default());

        let store = Arc::new(Self {
            pool,
            entries_tx,
            metadata_tx,
        });
        store.refresh().await?;

        let poller = Arc::clone(&store);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Store poll task stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = poller.refresh().await {
                            tracing::warn!(error = %e, "Snapshot refresh failed");
                        }
                    }
                }
            }
        });

        Ok(store)
    }

    /// Re-query both collections and publish fresh snapshots.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let query =
            format!("SELECT {ENTRY_COLUMNS} FROM queue_entries ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query_as::<_, EntryRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        let entries = rows
            .into_iter()
            .map(QueueEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let metadata: MetadataRow = sqlx::query_as(
            "SELECT last_token_number, current_serving_token FROM queue_metadata WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        self.entries_tx.send_replace(entries);
        self.metadata_tx.send_replace(metadata.into());
        Ok(())
    }
}

#[async_trait]
impl QueueStore for PgStore {
    fn subscribe_entries(&self) -> watch::Receiver<Vec<QueueEntry>> {
        self.entries_tx.subscribe()
    }

    fn subscribe_metadata(&self) -> watch::Receiver<QueueMetadata> {
        self.metadata_tx.subscribe()
    }

    async fn commit(&self, batch: Batch) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        if !batch.guards.is_empty() {
            // Lock the metadata row so concurrent guarded batches are
            // serialized here.
            let row: MetadataRow = sqlx::query_as(
                "SELECT last_token_number, current_serving_token
                 FROM queue_metadata WHERE id = 1 FOR UPDATE",
            )
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
            let metadata = QueueMetadata::from(row);

            for guard in &batch.guards {
                if !guard.holds_for(&metadata) {
                    // Dropping the transaction rolls it back.
                    return Err(CoreError::Conflict(format!(
                        "metadata guard failed: {guard:?} against {metadata:?}"
                    )));
                }
            }
        }

        for op in &batch.ops {
            apply_op(&mut tx, op).await?;
        }

        tx.commit().await.map_err(db_error)?;

        // The transaction is durable at this point. A failed refresh
        // only delays snapshot fan-out until the poll task catches up,
        // so it must not be reported as an operation failure.
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Snapshot refresh after commit failed");
        }
        Ok(())
    }

    async fn healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// ---------------------------------------------------------------------------
// Operation SQL
// ---------------------------------------------------------------------------

async fn apply_op(tx: &mut Transaction<'_, Postgres>, op: &BatchOp) -> Result<(), CoreError> {
    match op {
        BatchOp::CreateEntry(entry) => {
            sqlx::query(
                "INSERT INTO queue_entries
                    (id, user_id, user_name, status, token_number, line_position,
                     created_at, served_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(&entry.user_name)
            .bind(entry.status.as_str())
            .bind(entry.token_number)
            .bind(entry.position)
            .bind(entry.created_at)
            .bind(entry.served_at)
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;
        }
        BatchOp::UpdateEntry { id, patch } => {
            // $4 flags whether the position field is present at all;
            // $5 carries the (nullable) value when it is.
            let result = sqlx::query(
                "UPDATE queue_entries SET
                    status = COALESCE($2, status),
                    token_number = COALESCE($3, token_number),
                    line_position = CASE WHEN $4 THEN $5 ELSE line_position END,
                    served_at = COALESCE($6, served_at)
                 WHERE id = $1",
            )
            .bind(*id)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.token_number)
            .bind(patch.position.is_some())
            .bind(patch.position.flatten())
            .bind(patch.served_at)
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;

            if result.rows_affected() == 0 {
                return Err(CoreError::NotFound {
                    entity: "queue entry",
                    id: *id,
                });
            }
        }
        BatchOp::DeleteEntry(id) => {
            sqlx::query("DELETE FROM queue_entries WHERE id = $1")
                .bind(*id)
                .execute(&mut **tx)
                .await
                .map_err(db_error)?;
        }
        BatchOp::SetMetadata(metadata) => {
            sqlx::query(
                "UPDATE queue_metadata
                 SET last_token_number = $1, current_serving_token = $2
                 WHERE id = 1",
            )
            .bind(metadata.last_token_number)
            .bind(metadata.current_serving_token)
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;
        }
    }
    Ok(())
}

/// Classify a sqlx error: connectivity problems surface as
/// store-unavailable, everything else as internal.
fn db_error(err: sqlx::Error) -> CoreError {
    if matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    ) {
        CoreError::StoreUnavailable(err.to_string())
    } else {
        CoreError::Internal(err.to_string())
    }
}
