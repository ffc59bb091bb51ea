//! The user store contract.

use crate::context::Context;
use crate::error::Result;
use crate::types::User;

/// CRUD operations over persisted [`User`] records.
///
/// Implementations must be safe to share between threads; every operation
/// takes a [`Context`] and must return promptly with a cancellation error
/// once that context fires, including while waiting on a lock. Stores never
/// log failures: every error is returned to the caller.
///
/// Only [`get_by_id`](Self::get_by_id) and [`list_all`](Self::list_all) are
/// idempotent.
pub trait UserStore: Send + Sync {
    /// Inserts a new record for `user.username` / `user.email`.
    ///
    /// On success the store-assigned `id` and `created_at` are written back
    /// into `user`. The insert is atomic: on any failure no row remains.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`](crate::StoreError::Duplicate) if the
    /// username or email is already taken, otherwise
    /// [`StoreError::Storage`](crate::StoreError::Storage).
    fn create(&self, ctx: &Context, user: &mut User) -> Result<()>;

    /// Returns the stored record for `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) when no row
    /// has that identifier.
    fn get_by_id(&self, ctx: &Context, id: i64) -> Result<User>;

    /// Returns every stored record, ordered by identifier. Empty when the
    /// store holds no users.
    fn list_all(&self, ctx: &Context) -> Result<Vec<User>>;

    /// Overwrites `username` and `email` of the record `user.id`.
    ///
    /// `created_at` is never changed.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) when no row
    /// was affected, [`StoreError::Duplicate`](crate::StoreError::Duplicate)
    /// when the new values collide with another record.
    fn update(&self, ctx: &Context, user: &User) -> Result<()>;

    /// Permanently removes the record `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) when no row
    /// was affected.
    fn delete(&self, ctx: &Context, id: i64) -> Result<()>;

    /// Releases the underlying handle. Every later call, including a second
    /// `close`, fails with a closed-store error.
    fn close(&self) -> Result<()>;
}
