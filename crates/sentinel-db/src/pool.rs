//! SQLite connection pooling for the audit store.
//!
//! Every pooled connection comes up in WAL mode with a busy timeout, which
//! is what the pipeline's access pattern needs: ingest handlers upserting
//! events while query handlers read concurrently.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::time::Duration;
use thiserror::Error;

/// A pooled SQLite connection handle.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Tunables for the audit store's connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbSettings {
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,

    /// Upper bound on concurrently open connections.
    pub pool_max_size: u32,
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            pool_max_size: 8,
        }
    }
}

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Per-connection setup, run by the pool each time it opens a connection.
///
/// WAL keeps readers unblocked during upsert writes; `synchronous = NORMAL`
/// is the durability level WAL is designed to pair with. The busy timeout
/// covers the short writer lock each upsert holds.
fn init_connection(conn: &Connection, settings: &DbSettings) -> Result<(), rusqlite::Error> {
    let journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    // :memory: databases report "memory"; any other non-wal answer means
    // the pragma was refused.
    if !matches!(journal_mode.as_str(), "wal" | "memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode WAL refused, got {journal_mode:?}")),
        ));
    }

    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(
        None,
        "busy_timeout",
        settings.busy_timeout.as_millis() as i64,
    )?;
    Ok(())
}

/// Opens a pooled SQLite database at `db_path`, creating the file if needed.
///
/// `db_path` may be `:memory:` (useful in tests); pair that with
/// `pool_max_size: 1`, since every pooled connection to `:memory:` would
/// otherwise open its own private database.
///
/// # Errors
///
/// Returns [`PoolError::PoolInit`] if the pool cannot be created.
pub fn create_pool(db_path: &str, settings: DbSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| init_connection(conn, &settings));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    Ok(pool)
}
