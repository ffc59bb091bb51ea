//! Core user-record types and the storage contract.
//!
//! This crate defines everything a caller needs to talk to a user store
//! without knowing which engine sits behind it:
//!
//! - [`User`] — the single persisted entity.
//! - [`UserStore`] — the CRUD contract every backend implements.
//! - [`StoreError`] — the error taxonomy (`Connection`, `Duplicate`,
//!   `NotFound`, `Storage`) callers branch on.
//! - [`Context`] — an explicit cancellation/deadline token threaded through
//!   every store operation.
//!
//! Field validation ([`validate_user`]) is provided for front ends that want
//! to reject obviously bad input before reaching the store.
//!
//! # Example
//!
//! ```
//! use userstore_core::*;
//!
//! let user = User::new("alice", "alice@example.com");
//! assert!(!user.is_persisted());
//! assert!(validate_user(&user).is_empty());
//!
//! let ctx = Context::background();
//! assert!(ctx.err().is_none());
//! ```

mod context;
mod error;
mod store;
mod types;
mod validate;

pub use context::{Context, ContextError};
pub use error::{Result, StorageErrorKind, StoreError};
pub use store::UserStore;
pub use types::User;
pub use validate::{ValidationError, validate_user};
