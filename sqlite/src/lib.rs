//! SQLite storage backend for user records.
//!
//! This crate provides [`SqliteStore`], the SQLite implementation of the
//! [`UserStore`](userstore_core::UserStore) contract. It owns a single
//! connection, applies the connection pragmas, ensures the `users` table
//! exists, and translates engine failures into the
//! [`StoreError`](userstore_core::StoreError) taxonomy.
//!
//! # Architecture
//!
//! - **`schema`** — the `users` table DDL and existence checks
//! - **`pragma`** — the WAL/synchronous/foreign-key/busy-timeout block
//! - **`options`** — tunable [`StoreOptions`]
//! - **`error`** — `rusqlite::Error` → `StoreError` classification
//! - **`store`** — [`SqliteStore`] and its CRUD operations
//!
//! # Quick start
//!
//! ```
//! use userstore_core::{Context, User, UserStore};
//! use userstore_sqlite::{SqliteStore, StoreOptions};
//!
//! let store = SqliteStore::open_in_memory(&StoreOptions::default()).unwrap();
//! let ctx = Context::background();
//!
//! let mut user = User::new("alice", "alice@example.com");
//! store.create(&ctx, &mut user).unwrap();
//! assert_eq!(user.id, 1);
//!
//! let loaded = store.get_by_id(&ctx, user.id).unwrap();
//! assert_eq!(loaded, user);
//!
//! store.close().unwrap();
//! ```

mod error;
mod options;
mod pragma;
mod schema;
mod store;

pub use options::StoreOptions;
pub use pragma::PragmaSettings;
pub use store::{IN_MEMORY_PATH, SqliteStore, StoreStatus};
