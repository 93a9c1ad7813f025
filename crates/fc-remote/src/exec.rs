//! Remote command execution abstraction.
//!
//! Every check in fc-core drives the appliance through the [`Runner`]
//! trait: a synchronous exec channel with privileged and unprivileged
//! variants, returning exit code, stdout, and stderr. The SSH-backed
//! implementation lives in [`crate::ssh`]; tests use the scripted mock
//! appliance instead.

use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while executing a remote command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("ssh binary not found: {0}")]
    SshNotFound(#[source] io::Error),

    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("ssh connection to {host} failed: {message}")]
    ConnectionFailed { host: String, message: String },

    #[error("remote command timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Output from a remote command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutput {
    /// Exit code (if the process terminated normally).
    pub exit_code: Option<i32>,

    /// Captured standard output (lossy UTF-8).
    pub stdout: String,

    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ExecOutput {
    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Synchronous remote command execution channel.
///
/// `exec` runs as the configured appliance user; `root_exec` runs the
/// command with elevated privileges. Both block until the command
/// completes and return the full captured output.
pub trait Runner {
    /// Execute a command as the unprivileged appliance user.
    fn exec(&self, command: &str) -> Result<ExecOutput, ExecError>;

    /// Execute a command with root privileges.
    fn root_exec(&self, command: &str) -> Result<ExecOutput, ExecError>;
}

impl From<ExecError> for fc_common::Error {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::ConnectionFailed { host, message } => {
                fc_common::Error::ConnectionFailed { host, message }
            }
            ExecError::Timeout(d) => fc_common::Error::ExecTimeout {
                seconds: d.as_secs(),
            },
            other => fc_common::Error::Exec(other.to_string()),
        }
    }
}

/// Quote a string for safe interpolation into `sh -c '...'`.
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_zero_exit() {
        let out = ExecOutput {
            exit_code: Some(0),
            stdout: "ok\n".to_string(),
            stderr: String::new(),
        };
        assert!(out.success());
        assert_eq!(out.stdout_trimmed(), "ok");

        let failed = ExecOutput {
            exit_code: Some(1),
            ..out.clone()
        };
        assert!(!failed.success());

        let killed = ExecOutput {
            exit_code: None,
            ..out
        };
        assert!(!killed.success());
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("a'b"), r"'a'\''b'");
    }
}
