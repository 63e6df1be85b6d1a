//! Error types for scenelock.
//!
//! This module provides the unified error type [`SceneLockError`] for all lock,
//! session and RPC operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Locking**: a grant could not be issued. The only retryable category.
//! - **Unlock protocol**: a release named an id/owner pair that holds nothing.
//!   Always a caller bug, never retried.
//! - **Session**: an editing-state precondition did not hold.
//! - **Resolution**: an object id could not be placed under a root.
//! - **Configuration / IO**: ambient failures of the server surface.
//!
//! # Example
//!
//! ```rust
//! use scenelock::error::SceneLockError;
//!
//! let err = SceneLockError::LockingFailed { object_id: "ap1".into() };
//! assert!(err.is_retryable());
//!
//! let err = SceneLockError::NotLocked { object_id: "ap1".into() };
//! assert!(!err.is_retryable());
//! ```

use std::io;
use thiserror::Error;

/// Main error type for scenelock operations.
#[derive(Error, Debug)]
pub enum SceneLockError {
    // Locking errors
    #[error("Locking of object {object_id} failed")]
    LockingFailed { object_id: String },

    // Unlock protocol violations
    #[error("Object {object_id} is not locked")]
    NotLocked { object_id: String },

    #[error("Object {object_id} is not locked by {owner}")]
    OwnerMismatch { object_id: String, owner: String },

    // Session errors
    #[error("Precondition failed: {0}")]
    Precondition(String),

    // Resolution errors
    #[error("Unknown object: {0}")]
    UnknownObject(String),

    // Aggregated release failures
    #[error("{cause}; rollback failed for {} object(s)", .failures.len())]
    RollbackFailed {
        cause: Box<SceneLockError>,
        failures: Vec<SceneLockError>,
    },

    #[error("Release failed for {} object(s)", .0.len())]
    ReleaseFailed(Vec<SceneLockError>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // External errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SceneLockError {
    /// Check if error is retryable.
    ///
    /// Only a denied acquisition is transient. Everything else reports a
    /// caller bug or a broken environment and must surface immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SceneLockError::LockingFailed { .. })
    }

    /// Stable category name, used in RPC responses and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            SceneLockError::LockingFailed { .. } => "locking_failed",
            SceneLockError::NotLocked { .. } | SceneLockError::OwnerMismatch { .. } => {
                "unlock_violation"
            }
            SceneLockError::Precondition(_) => "precondition",
            SceneLockError::UnknownObject(_) => "unknown_object",
            SceneLockError::RollbackFailed { .. } | SceneLockError::ReleaseFailed(_) => {
                "release_failed"
            }
            SceneLockError::InvalidArgument(_) => "invalid_argument",
            SceneLockError::Config(_) | SceneLockError::InvalidConfig { .. } => "config",
            SceneLockError::Io(_) => "io",
            SceneLockError::Serialization(_) => "serialization",
            SceneLockError::Network(_) => "network",
            SceneLockError::Internal(_) => "internal",
        }
    }

    /// Flatten the error into user-facing messages.
    ///
    /// Aggregated variants expand into one message per contained failure so
    /// that none of them is dropped on the way to the client.
    pub fn messages(&self) -> Vec<String> {
        match self {
            SceneLockError::RollbackFailed { cause, failures } => {
                let mut messages = vec![cause.to_string()];
                messages.extend(failures.iter().map(|e| format!("rollback: {}", e)));
                messages
            }
            SceneLockError::ReleaseFailed(failures) => {
                failures.iter().map(|e| format!("release: {}", e)).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

impl From<serde_json::Error> for SceneLockError {
    fn from(e: serde_json::Error) -> Self {
        SceneLockError::Serialization(e.to_string())
    }
}

/// Result type alias for scenelock operations.
pub type Result<T> = std::result::Result<T, SceneLockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_locking_failures_are_retryable() {
        assert!(SceneLockError::LockingFailed { object_id: "a".into() }.is_retryable());
        assert!(!SceneLockError::NotLocked { object_id: "a".into() }.is_retryable());
        assert!(!SceneLockError::Precondition("x".into()).is_retryable());
        assert!(!SceneLockError::UnknownObject("a".into()).is_retryable());

        let rollback = SceneLockError::RollbackFailed {
            cause: Box::new(SceneLockError::LockingFailed { object_id: "b".into() }),
            failures: vec![],
        };
        assert!(!rollback.is_retryable());
    }

    #[test]
    fn test_messages_expand_aggregates() {
        let err = SceneLockError::RollbackFailed {
            cause: Box::new(SceneLockError::LockingFailed { object_id: "b".into() }),
            failures: vec![
                SceneLockError::NotLocked { object_id: "a".into() },
                SceneLockError::OwnerMismatch { object_id: "c".into(), owner: "ui".into() },
            ],
        };

        let messages = err.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], "Locking of object b failed");
        assert!(messages[1].contains("a is not locked"));
        assert!(messages[2].contains("not locked by ui"));
        assert_eq!(err.kind(), "release_failed");
    }
}
