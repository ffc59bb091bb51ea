//! Error taxonomy for user store operations.
//!
//! Every store failure maps to exactly one [`StoreError`] variant so callers
//! can branch on "not found" or "duplicate" without inspecting messages.

use std::fmt;

use thiserror::Error;

use crate::context::ContextError;

/// Sub-classification of [`StoreError::Storage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Engine-level failure (I/O, malformed row, ...).
    Engine,
    /// Another connection held the database lock for the whole busy timeout.
    Busy,
    /// The store has been closed.
    Closed,
    /// The operation's context was cancelled.
    Cancelled,
    /// The operation's context deadline passed.
    DeadlineExceeded,
    /// A constraint other than uniqueness rejected the write.
    Constraint,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Engine => "engine",
            Self::Busy => "busy",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::Constraint => "constraint",
        };
        f.write_str(label)
    }
}

/// Errors returned by [`UserStore`](crate::UserStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be opened or initialized.
    #[error("connection error: {0}")]
    Connection(String),

    /// A uniqueness constraint on `username` or `email` was violated.
    ///
    /// `field` names the offending column when the engine reports it.
    #[error("user already exists")]
    Duplicate { field: Option<String> },

    /// No record has the given identifier.
    #[error("user not found: {0}")]
    NotFound(i64),

    /// Any other failure.
    #[error("storage error ({kind}): {message}")]
    Storage {
        kind: StorageErrorKind,
        message: String,
    },
}

impl StoreError {
    /// Builds a [`StoreError::Storage`] of the given kind.
    pub fn storage(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self::Storage {
            kind,
            message: message.into(),
        }
    }

    /// Error returned by every operation on a closed store.
    pub fn closed() -> Self {
        Self::storage(StorageErrorKind::Closed, "store is closed")
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns `true` for both explicit cancellation and an expired deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Storage {
                kind: StorageErrorKind::Cancelled | StorageErrorKind::DeadlineExceeded,
                ..
            }
        )
    }

    /// Returns the storage sub-kind, if this is a [`StoreError::Storage`].
    pub fn storage_kind(&self) -> Option<StorageErrorKind> {
        match self {
            Self::Storage { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<ContextError> for StoreError {
    fn from(err: ContextError) -> Self {
        let kind = match err {
            ContextError::Cancelled => StorageErrorKind::Cancelled,
            ContextError::DeadlineExceeded => StorageErrorKind::DeadlineExceeded,
        };
        Self::storage(kind, err.to_string())
    }
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
