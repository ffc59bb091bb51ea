//! User field validation.
//!
//! Front ends call [`validate_user`] before handing a record to a store so
//! that empty or malformed input is rejected locally.
//!
//! # Examples
//!
//! ```
//! use userstore_core::*;
//!
//! assert!(validate_user(&User::new("alice", "alice@example.com")).is_empty());
//!
//! let errors = validate_user(&User::new("", "not-an-email"));
//! assert!(errors.contains(&ValidationError::EmptyUsername));
//! assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidEmail(_))));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::User;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("static regex must compile"));

/// User field validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Username is empty or whitespace-only.
    #[error("username is required")]
    EmptyUsername,
    /// Email is empty or whitespace-only.
    #[error("email is required")]
    EmptyEmail,
    /// Email is not of the form `local@domain`.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Validates the client-supplied fields of a user record.
///
/// Returns every problem found; an empty vector means the record is valid.
pub fn validate_user(user: &User) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if user.username.trim().is_empty() {
        errors.push(ValidationError::EmptyUsername);
    }

    let email = user.email.trim();
    if email.is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !EMAIL_RE.is_match(email) {
        errors.push(ValidationError::InvalidEmail(email.to_string()));
    }

    errors
}
