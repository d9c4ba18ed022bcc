//! Durable state for reshare: events, publishers and the append-only
//! publication log.
//!
//! [`PersistenceGateway`] is the only writer. `commit` applies a publish
//! [`reshare_publisher::Report`] atomically and recomputes the event's
//! derived status over all of its publications.

pub mod error;
pub mod gateway;
pub mod store_memory;
pub mod store_sqlite;

pub use {
    error::{Error, Result},
    gateway::{CommitSummary, PersistenceGateway, TimeWindow},
    store_memory::InMemoryGateway,
    store_sqlite::SqliteGateway,
};

/// Run database migrations for the storage crate.
///
/// Creates the `events`, `publishers` and `publications` tables.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
