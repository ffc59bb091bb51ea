//! Connection pragmas applied once when a store is opened.
//!
//! The block runs before the schema is created, in this order:
//!
//! 1. `journal_mode = WAL` — readers are not blocked by an in-progress writer
//! 2. `synchronous = NORMAL` — fsync at checkpoints only
//! 3. `foreign_keys = ON` — references are checked at write time
//! 4. busy timeout — lock contention waits instead of failing immediately
//!
//! In-memory databases cannot use WAL and report `memory` instead; that is
//! accepted.

use rusqlite::Connection;
use userstore_core::{Result, StoreError};

use crate::options::{MAX_BUSY_TIMEOUT_MS, StoreOptions};

/// Pragma values as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PragmaSettings {
    /// Lower-cased journal mode (`wal` on disk, `memory` in memory).
    pub journal_mode: String,
    /// `0` off, `1` normal, `2` full, `3` extra.
    pub synchronous: i64,
    pub foreign_keys: bool,
    pub busy_timeout_ms: i64,
}

/// Applies the pragma block. Returns the journal mode the engine settled on.
///
/// # Errors
///
/// Returns [`StoreError::Connection`] naming the first pragma that failed,
/// including a busy timeout the engine cannot represent.
pub(crate) fn apply(conn: &Connection, options: &StoreOptions) -> Result<String> {
    let busy_timeout = options.checked_busy_timeout().ok_or_else(|| {
        StoreError::Connection(format!(
            "failed to apply pragma busy_timeout: {} ms exceeds the limit of {MAX_BUSY_TIMEOUT_MS} ms",
            options.busy_timeout_ms
        ))
    })?;

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
        .map_err(|e| pragma_error("journal_mode = WAL", e))?;

    conn.execute_batch("PRAGMA synchronous = NORMAL;")
        .map_err(|e| pragma_error("synchronous = NORMAL", e))?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| pragma_error("foreign_keys = ON", e))?;

    conn.busy_timeout(busy_timeout)
        .map_err(|e| pragma_error("busy_timeout", e))?;

    Ok(journal_mode.to_ascii_lowercase())
}

/// Reads the current pragma values back from the engine.
pub(crate) fn read(conn: &Connection) -> rusqlite::Result<PragmaSettings> {
    let journal_mode: String = query_pragma(conn, "journal_mode")?;
    let synchronous: i64 = query_pragma(conn, "synchronous")?;
    let foreign_keys: i64 = query_pragma(conn, "foreign_keys")?;
    let busy_timeout_ms: i64 = query_pragma(conn, "busy_timeout")?;

    Ok(PragmaSettings {
        journal_mode: journal_mode.to_ascii_lowercase(),
        synchronous,
        foreign_keys: foreign_keys != 0,
        busy_timeout_ms,
    })
}

fn query_pragma<T: rusqlite::types::FromSql>(conn: &Connection, name: &str) -> rusqlite::Result<T> {
    conn.query_row(&format!("PRAGMA {name};"), [], |row| row.get(0))
}

fn pragma_error(pragma: &str, err: rusqlite::Error) -> StoreError {
    StoreError::Connection(format!("failed to apply pragma {pragma}: {err}"))
}
