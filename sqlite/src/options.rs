//! Tunable store settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time a statement waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Largest busy timeout the engine accepts (a signed 32-bit millisecond count).
pub const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Settings applied when a [`SqliteStore`](crate::SqliteStore) is opened.
///
/// Deserializable so front ends can embed it in their configuration files;
/// missing fields take their defaults.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use userstore_sqlite::StoreOptions;
///
/// let options = StoreOptions::default();
/// assert_eq!(options.busy_timeout(), Duration::from_secs(5));
///
/// let fast = StoreOptions::default().with_busy_timeout(Duration::from_millis(250));
/// assert_eq!(fast.busy_timeout_ms, 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Milliseconds to wait for a lock held by another connection.
    pub busy_timeout_ms: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreOptions {
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Returns the busy timeout if the engine can represent it.
    pub fn checked_busy_timeout(&self) -> Option<Duration> {
        (self.busy_timeout_ms <= MAX_BUSY_TIMEOUT_MS).then(|| self.busy_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let options: StoreOptions = serde_yaml::from_str("{}").unwrap();
        assert_eq!(options, StoreOptions::default());

        let options: StoreOptions = serde_yaml::from_str("busy_timeout_ms: 750").unwrap();
        assert_eq!(options.busy_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_checked_busy_timeout_bounds() {
        let options = StoreOptions {
            busy_timeout_ms: MAX_BUSY_TIMEOUT_MS,
        };
        assert!(options.checked_busy_timeout().is_some());

        let options: StoreOptions = serde_yaml::from_str("busy_timeout_ms: 3000000000").unwrap();
        assert_eq!(options.checked_busy_timeout(), None);
    }
}
