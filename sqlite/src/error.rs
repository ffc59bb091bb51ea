//! Translation of SQLite failures into the store error taxonomy.
//!
//! Uniqueness violations are recognised from the extended result code;
//! the `"UNIQUE constraint failed"` message text is only consulted when the
//! engine did not supply one.

use rusqlite::ErrorCode;
use rusqlite::ffi;
use userstore_core::{Context, StorageErrorKind, StoreError};

const UNIQUE_FAILED: &str = "UNIQUE constraint failed";

/// Classifies an engine error raised while performing `action`.
///
/// `ctx` decides whether an interrupted statement is reported as a
/// cancellation or as an expired deadline. Lock contention is reported
/// through `ctx` as well once it has fired, and as
/// [`StorageErrorKind::Busy`] otherwise.
pub(crate) fn classify(err: rusqlite::Error, ctx: &Context, action: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        match failure.code {
            ErrorCode::OperationInterrupted => {
                return match ctx.err() {
                    Some(reason) => reason.into(),
                    None => StoreError::storage(
                        StorageErrorKind::Cancelled,
                        format!("failed to {action}: interrupted"),
                    ),
                };
            }
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                return match ctx.err() {
                    Some(reason) => reason.into(),
                    None => StoreError::storage(
                        StorageErrorKind::Busy,
                        format!("failed to {action}: {err}"),
                    ),
                };
            }
            ErrorCode::ConstraintViolation => {
                let unique = matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                );
                if unique {
                    return StoreError::Duplicate {
                        field: message.as_deref().and_then(duplicate_field),
                    };
                }
                if failure.extended_code == ffi::SQLITE_CONSTRAINT {
                    if let Some(text) = message.as_deref().filter(|m| m.contains(UNIQUE_FAILED)) {
                        return StoreError::Duplicate {
                            field: duplicate_field(text),
                        };
                    }
                }
                return StoreError::storage(
                    StorageErrorKind::Constraint,
                    format!("failed to {action}: {err}"),
                );
            }
            _ => {}
        }
    }

    let text = err.to_string();
    if text.contains(UNIQUE_FAILED) {
        return StoreError::Duplicate {
            field: duplicate_field(&text),
        };
    }
    StoreError::storage(StorageErrorKind::Engine, format!("failed to {action}: {text}"))
}

/// Extracts the column from `"UNIQUE constraint failed: users.email"`.
fn duplicate_field(message: &str) -> Option<String> {
    let (_, columns) = message.split_once(UNIQUE_FAILED)?;
    let first = columns.trim_start_matches(':').split(',').next()?.trim();
    let column = first.rsplit('.').next()?.trim();
    if column.is_empty() {
        None
    } else {
        Some(column.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), Some(message.to_string()))
    }

    #[test]
    fn test_duplicate_field_parsing() {
        assert_eq!(
            duplicate_field("UNIQUE constraint failed: users.username").as_deref(),
            Some("username")
        );
        assert_eq!(
            duplicate_field("UNIQUE constraint failed: users.email, users.username").as_deref(),
            Some("email")
        );
        assert_eq!(duplicate_field("UNIQUE constraint failed"), None);
        assert_eq!(duplicate_field("disk I/O error"), None);
    }

    #[test]
    fn test_unique_extended_code_is_duplicate() {
        let ctx = Context::background();
        let err = classify(
            failure(
                ffi::SQLITE_CONSTRAINT_UNIQUE,
                "UNIQUE constraint failed: users.email",
            ),
            &ctx,
            "insert user",
        );
        assert_eq!(
            err,
            StoreError::Duplicate {
                field: Some("email".to_string())
            }
        );
    }

    #[test]
    fn test_message_fallback_without_extended_code() {
        let ctx = Context::background();
        let err = classify(
            failure(ffi::SQLITE_CONSTRAINT, "UNIQUE constraint failed: users.username"),
            &ctx,
            "insert user",
        );
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_other_constraints_are_not_duplicates() {
        let ctx = Context::background();
        let err = classify(
            failure(
                ffi::SQLITE_CONSTRAINT_NOTNULL,
                "NOT NULL constraint failed: users.email",
            ),
            &ctx,
            "insert user",
        );
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::Constraint));
    }

    #[test]
    fn test_interrupt_follows_context() {
        let ctx = Context::background();
        let err = classify(failure(ffi::SQLITE_INTERRUPT, "interrupted"), &ctx, "list users");
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::Cancelled));

        let expired = Context::background().with_timeout(std::time::Duration::ZERO);
        let err = classify(
            failure(ffi::SQLITE_INTERRUPT, "interrupted"),
            &expired,
            "list users",
        );
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::DeadlineExceeded));
    }

    #[test]
    fn test_busy_follows_context() {
        let ctx = Context::background();
        let err = classify(failure(ffi::SQLITE_BUSY, "database is locked"), &ctx, "insert user");
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::Busy));
        assert!(err.to_string().contains("database is locked"));

        let expired = Context::background().with_timeout(std::time::Duration::ZERO);
        let err = classify(
            failure(ffi::SQLITE_BUSY, "database is locked"),
            &expired,
            "insert user",
        );
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::DeadlineExceeded));

        let cancelled = Context::background();
        cancelled.cancel();
        let err = classify(
            failure(ffi::SQLITE_LOCKED, "database table is locked"),
            &cancelled,
            "update user",
        );
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::Cancelled));
    }

    #[test]
    fn test_generic_errors_are_engine_failures() {
        let ctx = Context::background();
        let err = classify(rusqlite::Error::QueryReturnedNoRows, &ctx, "load user");
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::Engine));
        assert!(err.to_string().contains("failed to load user"));
    }
}
