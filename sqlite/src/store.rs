//! [`SqliteStore`]: the SQLite-backed [`UserStore`].
//!
//! The store owns one connection behind a mutex, so a single handle can be
//! shared between threads; SQLite serializes writers across processes.
//! Closing the store drops the connection, after which every operation
//! returns a closed-store error.
//!
//! The caller's [`Context`] is observed at every point an operation can
//! block: while waiting for the connection mutex, while a statement runs
//! (a progress handler interrupts it), and while the engine waits on a lock
//! held by another connection (the busy timeout is spent in short slices).

use std::path::Path;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;
use userstore_core::{Context, Result, StorageErrorKind, StoreError, User, UserStore};

use crate::error::classify;
use crate::options::StoreOptions;
use crate::pragma::{self, PragmaSettings};
use crate::schema::{count_users, schema_sql, tables_exist};

/// Path that selects an ephemeral in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Virtual machine instructions between two context checks.
const PROGRESS_INTERVAL: i32 = 1000;

/// Pause between attempts to take a contended connection mutex.
const LOCK_POLL: Duration = Duration::from_millis(1);

/// Longest single engine busy wait before the context is checked again.
const BUSY_SLICE: Duration = Duration::from_millis(25);

const SELECT_USER: &str = "SELECT id, username, email, created_at FROM users";

/// SQLite implementation of [`UserStore`].
///
/// # Examples
///
/// ```no_run
/// use userstore_core::{Context, User, UserStore};
/// use userstore_sqlite::{SqliteStore, StoreOptions};
///
/// let store = SqliteStore::open("users.db", &StoreOptions::default()).unwrap();
/// let ctx = Context::background();
///
/// for user in store.list_all(&ctx).unwrap() {
///     println!("{} {} {}", user.id, user.username, user.email);
/// }
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    location: String,
    busy_timeout: Duration,
}

/// Snapshot returned by [`SqliteStore::status`].
#[derive(Debug, Clone)]
pub struct StoreStatus {
    /// Database path, or `:memory:`.
    pub location: String,
    /// Whether the `users` table exists.
    pub tables_exist: bool,
    /// Number of stored users.
    pub user_count: usize,
    /// Pragma values in effect on the connection.
    pub pragmas: PragmaSettings,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    ///
    /// `path` equal to [`IN_MEMORY_PATH`] opens an ephemeral database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if `path` is a directory, the file
    /// cannot be opened, a pragma cannot be applied, or the schema cannot
    /// be created.
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new(IN_MEMORY_PATH) {
            return Self::open_in_memory(options);
        }
        if path.is_dir() {
            return Err(StoreError::Connection(format!(
                "failed to open database '{}': path is a directory",
                path.display()
            )));
        }

        let conn = Connection::open(path).map_err(|e| {
            StoreError::Connection(format!(
                "failed to open database '{}': {e}",
                path.display()
            ))
        })?;
        Self::initialize(conn, path.display().to_string(), options)
    }

    /// Opens an ephemeral in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the engine cannot be initialized.
    pub fn open_in_memory(options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            StoreError::Connection(format!("failed to open in-memory database: {e}"))
        })?;
        Self::initialize(conn, IN_MEMORY_PATH.to_string(), options)
    }

    fn initialize(conn: Connection, location: String, options: &StoreOptions) -> Result<Self> {
        let journal_mode = pragma::apply(&conn, options)?;
        let busy_timeout = options.busy_timeout();

        conn.execute_batch(schema_sql())
            .map_err(|e| StoreError::Connection(format!("failed to create schema: {e}")))?;

        debug!(
            location = %location,
            journal_mode = %journal_mode,
            busy_timeout_ms = options.busy_timeout_ms,
            "opened user store"
        );

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            location,
            busy_timeout,
        })
    }

    /// Returns the database path this store was opened with.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns `true` for an in-memory store.
    pub fn is_in_memory(&self) -> bool {
        self.location == IN_MEMORY_PATH
    }

    /// Reports table existence, row count, and the pragma values in effect.
    pub fn status(&self, ctx: &Context) -> Result<StoreStatus> {
        self.with_conn(ctx, |conn| {
            let exists = tables_exist(conn).map_err(|e| classify(e, ctx, "inspect schema"))?;
            let user_count = if exists {
                count_users(conn).map_err(|e| classify(e, ctx, "count users"))?
            } else {
                0
            };
            let pragmas = pragma::read(conn).map_err(|e| classify(e, ctx, "read pragmas"))?;
            Ok(StoreStatus {
                location: self.location.clone(),
                tables_exist: exists,
                user_count,
                pragmas,
            })
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn.lock().map_err(|_| poisoned())
    }

    /// Takes the connection mutex, giving up as soon as `ctx` fires.
    fn acquire(&self, ctx: &Context) -> Result<MutexGuard<'_, Option<Connection>>> {
        loop {
            match self.conn.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => {
                    ctx.check()?;
                    thread::sleep(LOCK_POLL);
                }
                Err(TryLockError::Poisoned(_)) => return Err(poisoned()),
            }
        }
    }

    /// Runs `f` on the open connection with `ctx` wired to the progress
    /// handler for the duration of the call.
    pub(crate) fn with_conn<T>(
        &self,
        ctx: &Context,
        f: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        ctx.check()?;
        let mut guard = self.acquire(ctx)?;
        let conn = guard.as_mut().ok_or_else(StoreError::closed)?;
        ctx.check()?;

        let watched = ctx.clone();
        conn.progress_handler(PROGRESS_INTERVAL, Some(move || watched.is_done()));
        let result = f(conn);
        conn.progress_handler(PROGRESS_INTERVAL, None::<fn() -> bool>);
        result
    }

    /// Like [`with_conn`](Self::with_conn), but spends the busy timeout in
    /// slices no longer than [`BUSY_SLICE`] or the context's remaining time,
    /// re-running `f` after each slice that ended on a held lock.
    ///
    /// `f` must leave nothing behind when it fails; every caller either runs
    /// a single statement or a transaction that rolls back on drop.
    fn with_busy_wait<T>(
        &self,
        ctx: &Context,
        mut f: impl FnMut(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        self.with_conn(ctx, |conn| {
            let started = Instant::now();
            let result = loop {
                if let Err(err) = ctx.check() {
                    break Err(StoreError::from(err));
                }
                let budget = self.busy_timeout.saturating_sub(started.elapsed());
                let slice = match ctx.remaining() {
                    Some(remaining) => budget.min(BUSY_SLICE).min(remaining),
                    None => budget.min(BUSY_SLICE),
                };
                if let Err(e) = conn.busy_timeout(slice) {
                    break Err(classify(e, ctx, "set busy timeout"));
                }

                match f(conn) {
                    Err(err)
                        if err.storage_kind() == Some(StorageErrorKind::Busy)
                            && started.elapsed() < self.busy_timeout =>
                    {
                        debug!(location = %self.location, "database locked, waiting");
                        thread::sleep(LOCK_POLL);
                    }
                    other => break other,
                }
            };

            conn.busy_timeout(self.busy_timeout)
                .map_err(|e| classify(e, ctx, "restore busy timeout"))?;
            result
        })
    }
}

fn poisoned() -> StoreError {
    StoreError::storage(StorageErrorKind::Engine, "connection lock poisoned")
}

impl UserStore for SqliteStore {
    fn create(&self, ctx: &Context, user: &mut User) -> Result<()> {
        self.with_busy_wait(ctx, |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| classify(e, ctx, "begin transaction"))?;

            tx.execute(
                "INSERT INTO users (username, email) VALUES (?1, ?2)",
                params![user.username, user.email],
            )
            .map_err(|e| classify(e, ctx, "insert user"))?;

            let id = tx.last_insert_rowid();
            let created_at: DateTime<Utc> = tx
                .query_row(
                    "SELECT created_at FROM users WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(|e| classify(e, ctx, "read assigned timestamp"))?;

            tx.commit()
                .map_err(|e| classify(e, ctx, "commit transaction"))?;

            user.id = id;
            user.created_at = created_at;
            Ok(())
        })
    }

    fn get_by_id(&self, ctx: &Context, id: i64) -> Result<User> {
        self.with_busy_wait(ctx, |conn| {
            conn.query_row(
                &format!("{SELECT_USER} WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(|e| classify(e, ctx, "get user"))?
            .ok_or(StoreError::NotFound(id))
        })
    }

    fn list_all(&self, ctx: &Context) -> Result<Vec<User>> {
        self.with_busy_wait(ctx, |conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_USER} ORDER BY id"))
                .map_err(|e| classify(e, ctx, "list users"))?;

            let users = stmt
                .query_map([], user_from_row)
                .map_err(|e| classify(e, ctx, "list users"))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| classify(e, ctx, "read user row"))?;
            Ok(users)
        })
    }

    fn update(&self, ctx: &Context, user: &User) -> Result<()> {
        self.with_busy_wait(ctx, |conn| {
            let rows = conn
                .execute(
                    "UPDATE users SET username = ?1, email = ?2 WHERE id = ?3",
                    params![user.username, user.email, user.id],
                )
                .map_err(|e| classify(e, ctx, "update user"))?;

            if rows == 0 {
                return Err(StoreError::NotFound(user.id));
            }
            Ok(())
        })
    }

    fn delete(&self, ctx: &Context, id: i64) -> Result<()> {
        self.with_busy_wait(ctx, |conn| {
            let rows = conn
                .execute("DELETE FROM users WHERE id = ?1", params![id])
                .map_err(|e| classify(e, ctx, "delete user"))?;

            if rows == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.lock()?;
        let conn = guard.take().ok_or_else(StoreError::closed)?;
        if let Err((conn, err)) = conn.close() {
            *guard = Some(conn);
            return Err(StoreError::storage(
                StorageErrorKind::Engine,
                format!("failed to close database: {err}"),
            ));
        }
        debug!(location = %self.location, "closed user store");
        Ok(())
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}
