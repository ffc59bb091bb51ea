//! User record definition.
//!
//! [`User`] is the only entity managed by the store. Client code builds a
//! record with [`User::new`]; the store fills in [`User::id`] and
//! [`User::created_at`] when the record is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored user record.
///
/// `id` and `created_at` are owned by the store: a record built with
/// [`User::new`] carries `id == 0` and the Unix epoch as its timestamp until
/// a successful [`create`](crate::UserStore::create) overwrites both.
///
/// # Examples
///
/// ```
/// use userstore_core::User;
///
/// let user = User::new("alice", "alice@example.com");
/// assert_eq!(user.id, 0);
/// assert!(!user.is_persisted());
/// assert!(!user.has_timestamp());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier (0 until created).
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Unique e-mail address.
    pub email: String,
    /// Creation time as recorded by the store's clock.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates an unsaved record with the given username and email.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            email: email.into(),
            created_at: DateTime::<Utc>::default(),
        }
    }

    /// Sets the identifier, for addressing an existing record.
    ///
    /// # Examples
    ///
    /// ```
    /// use userstore_core::User;
    ///
    /// let user = User::new("bob", "bob@example.com").with_id(7);
    /// assert_eq!(user.id, 7);
    /// assert!(user.is_persisted());
    /// ```
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Returns `true` once the store has assigned an identifier.
    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// Returns `true` if `created_at` holds a real timestamp rather than the
    /// zero value of an unsaved record.
    pub fn has_timestamp(&self) -> bool {
        self.created_at != DateTime::<Utc>::default()
    }
}
