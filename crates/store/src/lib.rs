//! Queue store: durability and change fan-out.
//!
//! The [`QueueStore`] trait is the contract the engine consumes: two
//! snapshot subscriptions (entries, metadata) plus an atomic batch-write
//! primitive with optional metadata guards. Two interchangeable
//! backends implement it:
//!
//! - [`MemoryStore`] -- single-process state behind a lock; used by
//!   tests and as the local backend.
//! - [`PgStore`] -- PostgreSQL via sqlx; batches run in one
//!   transaction, and a background poll task picks up writes made by
//!   other processes sharing the database.

pub mod batch;
pub mod memory;
pub mod postgres;
pub mod store;

pub use batch::{Batch, BatchGuard, BatchOp, EntryPatch};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::QueueStore;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run the embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
