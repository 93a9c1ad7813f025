//! Error types for Flowcheck.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//!
//! Per-subsystem errors (exec, storage, oracle) live next to their
//! modules; this type is the unified surface the CLI maps to exit codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Flowcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Remote command execution errors (ssh, spawn, timeout).
    Exec,
    /// Remote storage service and share transfer errors.
    Storage,
    /// Configuration document errors.
    Config,
    /// On-device artifact parsing and comparison errors.
    Oracle,
    /// Check precondition failures (e.g. daemon not running).
    Precondition,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Exec => write!(f, "exec"),
            ErrorCategory::Storage => write!(f, "storage"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Oracle => write!(f, "oracle"),
            ErrorCategory::Precondition => write!(f, "precondition"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Flowcheck.
#[derive(Error, Debug)]
pub enum Error {
    // Exec errors (10-19)
    #[error("remote execution failed: {0}")]
    Exec(String),

    #[error("connection to {host} failed: {message}")]
    ConnectionFailed { host: String, message: String },

    #[error("remote command timed out after {seconds}s")]
    ExecTimeout { seconds: u64 },

    // Storage errors (20-29)
    #[error("remote storage operation failed: {0}")]
    Storage(String),

    // Configuration errors (30-39)
    #[error("configuration error: {0}")]
    Config(String),

    // Oracle errors (40-49)
    #[error("artifact verification failed: {0}")]
    Oracle(String),

    // Precondition failures (50-59)
    #[error("check precondition failed: {0}")]
    Precondition(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Exec errors
    /// - 20-29: Storage errors
    /// - 30-39: Configuration errors
    /// - 40-49: Oracle errors
    /// - 50-59: Precondition failures
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Exec(_) => 10,
            Error::ConnectionFailed { .. } => 11,
            Error::ExecTimeout { .. } => 12,
            Error::Storage(_) => 20,
            Error::Config(_) => 30,
            Error::Oracle(_) => 40,
            Error::Precondition(_) => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Exec(_) | Error::ConnectionFailed { .. } | Error::ExecTimeout { .. } => {
                ErrorCategory::Exec
            }
            Error::Storage(_) => ErrorCategory::Storage,
            Error::Config(_) => ErrorCategory::Config,
            Error::Oracle(_) => ErrorCategory::Oracle,
            Error::Precondition(_) => ErrorCategory::Precondition,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Connection failures and timeouts may resolve on retry; a failed
    /// oracle comparison or a missing daemon will not without operator
    /// intervention.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed { .. } | Error::ExecTimeout { .. } | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        let e = Error::Exec("ssh died".into());
        assert_eq!(e.code(), 10);
        assert_eq!(e.category(), ErrorCategory::Exec);

        let e = Error::Oracle("PORT mismatch".into());
        assert_eq!(e.code(), 40);
        assert_eq!(e.category(), ErrorCategory::Oracle);
    }

    #[test]
    fn recoverability_hints() {
        let conn = Error::ConnectionFailed {
            host: "10.0.0.1".into(),
            message: "refused".into(),
        };
        assert!(conn.is_recoverable());
        assert!(!Error::Precondition("nfcapd not running".into()).is_recoverable());
    }
}
