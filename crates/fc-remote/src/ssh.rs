//! SSH-backed runner for a single appliance.
//!
//! Executes commands on the device under test via the `ssh` command and
//! captures their output. No persistent connection is held; each exec is
//! one ssh invocation, which keeps the channel stateless across the
//! appliance's own service restarts.

use crate::exec::{shell_quote, ExecError, ExecOutput, Runner};
use std::io;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for the SSH channel to the appliance.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// SSH user (if different from current user).
    pub user: Option<String>,
    /// Path to SSH identity file.
    pub identity_file: Option<String>,
    /// SSH port (default: 22).
    pub port: Option<u16>,
    /// Connection timeout in seconds.
    pub connect_timeout: u64,
    /// Command timeout in seconds (total time for the command to complete).
    pub command_timeout: u64,
    /// Extra SSH options passed via -o.
    pub ssh_options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: None,
            identity_file: None,
            port: None,
            connect_timeout: 10,
            command_timeout: 60,
            ssh_options: vec![
                "StrictHostKeyChecking=accept-new".to_string(),
                "BatchMode=yes".to_string(),
            ],
        }
    }
}

/// Runner that drives one appliance over SSH.
#[derive(Debug)]
pub struct SshRunner {
    host: String,
    config: SshConfig,
}

impl SshRunner {
    pub fn new(host: impl Into<String>, config: SshConfig) -> Self {
        Self {
            host: host.into(),
            config,
        }
    }

    /// The target host this runner is bound to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build the SSH command arguments for one remote command.
    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        // Connection options
        args.push("-o".to_string());
        args.push(format!("ConnectTimeout={}", self.config.connect_timeout));

        for opt in &self.config.ssh_options {
            args.push("-o".to_string());
            args.push(opt.clone());
        }

        if let Some(ref identity) = self.config.identity_file {
            args.push("-i".to_string());
            args.push(identity.clone());
        }

        if let Some(port) = self.config.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }

        // Target
        let target = if let Some(ref user) = self.config.user {
            format!("{}@{}", user, self.host)
        } else {
            self.host.clone()
        };
        args.push(target);

        // Remote command
        args.push(command.to_string());

        args
    }

    fn run(&self, command: &str) -> Result<ExecOutput, ExecError> {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.command_timeout);
        let args = self.build_ssh_args(command);

        debug!(host = %self.host, command, "executing remote command");

        let output = match Command::new("ssh").args(&args).output() {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ExecError::SshNotFound(e));
            }
            Err(e) => return Err(ExecError::SpawnFailed(e.to_string())),
        };

        // Command::output blocks, so the timeout check is post-hoc
        if start.elapsed() > timeout {
            return Err(ExecError::Timeout(timeout));
        }

        let exit_code = output.status.code();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        // ssh reserves 255 for its own failures (auth, DNS, refused)
        if exit_code == Some(255) {
            warn!(host = %self.host, stderr = %stderr.trim(), "ssh transport failure");
            return Err(ExecError::ConnectionFailed {
                host: self.host.clone(),
                message: stderr.trim().to_string(),
            });
        }

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

impl Runner for SshRunner {
    fn exec(&self, command: &str) -> Result<ExecOutput, ExecError> {
        self.run(command)
    }

    fn root_exec(&self, command: &str) -> Result<ExecOutput, ExecError> {
        self.run(&format!("sudo sh -c {}", shell_quote(command)))
    }
}
