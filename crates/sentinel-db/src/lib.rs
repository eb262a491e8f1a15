//! Storage layer for the Sentinel audit pipeline.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and the audit event store. The store is the
//! system's deduplication point: writes are keyed by `event_id` in a single
//! atomic upsert, so at-least-once delivery from retrying clients collapses
//! to exactly one stored row per logical event.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a single-file embedded store is enough for
//!   one ingestion service; WAL allows concurrent readers alongside the
//!   writer, which matches the ingest-heavy/query-light access pattern.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL ships inside the binary via `include_str!`
//!   and cannot drift from the code that depends on it.

mod migrations;
mod pool;
mod store;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbSettings, PoolError};
pub use store::{count_for_agent, events_for_agent, insert_event, StoreError};
