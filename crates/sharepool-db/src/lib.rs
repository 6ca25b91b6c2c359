//! # sharepool-db
//!
//! Database access layer for the SharePool daemon.
//! Manages the single SQLite database at `$SHAREPOOL_DATA_DIR/sharepool.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - Money stored as integer cents, percentages as basis points
//! - All timestamps are Unix epoch seconds (u64)
//! - Schema version stored in `PRAGMA user_version`
//!
//! Multi-row writes go through [`immediate`], which takes SQLite's write
//! lock up front. Concurrent writers queue on `busy_timeout` instead of
//! racing a stale read.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Milliseconds a writer waits for the lock before failing with `SQLITE_BUSY`.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// True if SQLite rejected the write because of a UNIQUE index.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }

    /// True for any other constraint failure (CHECK, FOREIGN KEY, trigger abort).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            DbError::Constraint(_) => true,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the SharePool database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};
         PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;"
    ))?;
    Ok(())
}

/// Run `f` inside a `BEGIN IMMEDIATE` transaction.
///
/// Commits when `f` returns `Ok`; any `Err` drops the transaction, which
/// rolls back every write `f` made.
pub fn immediate<T, E, F>(conn: &mut Connection, f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&rusqlite::Transaction<'_>) -> std::result::Result<T, E>,
    E: From<DbError>,
{
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DbError::from)?;
    let out = f(&tx)?;
    tx.commit().map_err(DbError::from)?;
    Ok(out)
}
