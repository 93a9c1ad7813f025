//! Collector daemon IO priority verification.
//!
//! The flow collector daemons must run at the highest best-effort IO
//! priority so ingest is preferred over nfdump queries. This check
//! discovers the collector PIDs on the appliance, drives their priority
//! through `ionice`, and confirms the reported value matches what was
//! set: first a non-default level, then back to the target, proving the
//! mechanism is bidirectional rather than idempotent-at-default.

use fc_common::ProcessId;
use fc_remote::exec::{ExecError, Runner};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Collector daemons whose IO priority is under test.
pub const COLLECTOR_PROCESSES: [&str; 3] = ["sfcapd", "xfcapd-streamd", "nfcapd"];

/// Priority levels applied in order: a throttled level first, then the
/// production target.
pub const PRIORITY_LEVELS: [u8; 2] = [3, 0];

/// IO scheduling class reported by ionice for the collector daemons.
const EXPECTED_CLASS: &str = "best-effort";

/// Errors from the IO priority check.
#[derive(Debug, Error)]
pub enum IoPrioError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("no running processes match '{process}'")]
    NoMatchingProcesses { process: String },

    #[error("unparseable pid in ps output for '{process}': {line:?}")]
    PidParse { process: String, line: String },

    #[error("failed to set io priority {level} on pid {pid}: {stderr}")]
    SetFailed {
        pid: ProcessId,
        level: u8,
        stderr: String,
    },

    #[error("failed to read io priority of pid {pid}: {stderr}")]
    ReadFailed { pid: ProcessId, stderr: String },

    #[error("unparseable ionice output for pid {pid}: {output:?}")]
    PriorityParse { pid: ProcessId, output: String },

    #[error(
        "io priority mismatch for {process} pid {pid}: expected {expected}, reported {actual}"
    )]
    PriorityMismatch {
        process: String,
        pid: ProcessId,
        expected: IoPriority,
        actual: IoPriority,
    },
}

impl From<IoPrioError> for fc_common::Error {
    fn from(e: IoPrioError) -> Self {
        match e {
            IoPrioError::Exec(exec) => exec.into(),
            IoPrioError::NoMatchingProcesses { ref process } => {
                fc_common::Error::Precondition(format!(
                    "no running processes match '{}'",
                    process
                ))
            }
            other => fc_common::Error::Oracle(other.to_string()),
        }
    }
}

/// An IO scheduling class and level as reported by ionice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoPriority {
    pub class: String,
    pub level: u8,
}

impl IoPriority {
    /// The best-effort priority the check expects at a given level.
    pub fn best_effort(level: u8) -> Self {
        IoPriority {
            class: EXPECTED_CLASS.to_string(),
            level,
        }
    }

    /// Parse ionice output of the form `best-effort: prio 3`.
    pub fn parse(output: &str) -> Option<Self> {
        let (class, rest) = output.trim().split_once(": prio ")?;
        let level = rest.trim().parse::<u8>().ok()?;
        Some(IoPriority {
            class: class.to_string(),
            level,
        })
    }
}

impl std::fmt::Display for IoPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: prio {}", self.class, self.level)
    }
}

/// Per-process result of the IO priority check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoPriorityReport {
    /// Collector daemon name.
    pub process: String,

    /// PIDs the check exercised.
    pub pids: Vec<ProcessId>,

    /// Priority levels set and read back successfully, in order.
    pub verified_levels: Vec<u8>,
}

/// Discover the PIDs of a named process on the appliance.
///
/// Zero matching processes is an explicit precondition failure: a check
/// that iterates over nothing would pass vacuously while the collector
/// is down.
pub fn discover_pids(runner: &dyn Runner, process: &str) -> Result<Vec<ProcessId>, IoPrioError> {
    let out = runner.root_exec(&format!("ps -C {} -o pid=", process))?;

    let mut pids = Vec::new();
    for line in out.stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let pid = line.parse::<ProcessId>().map_err(|_| IoPrioError::PidParse {
            process: process.to_string(),
            line: line.to_string(),
        })?;
        pids.push(pid);
    }

    if pids.is_empty() {
        return Err(IoPrioError::NoMatchingProcesses {
            process: process.to_string(),
        });
    }
    debug!(process, ?pids, "discovered collector pids");
    Ok(pids)
}

/// Set the best-effort IO priority level of one process.
pub fn set_priority(runner: &dyn Runner, pid: ProcessId, level: u8) -> Result<(), IoPrioError> {
    let out = runner.root_exec(&format!("ionice -p {} -n {}", pid, level))?;
    if !out.success() {
        return Err(IoPrioError::SetFailed {
            pid,
            level,
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Read back the IO priority of one process.
pub fn read_priority(runner: &dyn Runner, pid: ProcessId) -> Result<IoPriority, IoPrioError> {
    let out = runner.root_exec(&format!("ionice -p {}", pid))?;
    if !out.success() {
        return Err(IoPrioError::ReadFailed {
            pid,
            stderr: out.stderr.trim().to_string(),
        });
    }
    IoPriority::parse(&out.stdout).ok_or_else(|| IoPrioError::PriorityParse {
        pid,
        output: out.stdout_trimmed().to_string(),
    })
}

/// Set a priority level on every PID and confirm ionice reports it back.
fn verify_level(
    runner: &dyn Runner,
    process: &str,
    pids: &[ProcessId],
    level: u8,
) -> Result<(), IoPrioError> {
    let expected = IoPriority::best_effort(level);
    for pid in pids {
        set_priority(runner, *pid, level)?;
        let actual = read_priority(runner, *pid)?;
        if actual != expected {
            return Err(IoPrioError::PriorityMismatch {
                process: process.to_string(),
                pid: *pid,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Run the full bidirectional check for one collector daemon.
pub fn check_process(runner: &dyn Runner, process: &str) -> Result<IoPriorityReport, IoPrioError> {
    let pids = discover_pids(runner, process)?;

    let mut verified_levels = Vec::new();
    for level in PRIORITY_LEVELS {
        verify_level(runner, process, &pids, level)?;
        verified_levels.push(level);
    }

    info!(process, pids = pids.len(), "io priority verified");
    Ok(IoPriorityReport {
        process: process.to_string(),
        pids,
        verified_levels,
    })
}

/// Run the IO priority check over all collector daemons.
pub fn run_check(runner: &dyn Runner) -> Result<Vec<IoPriorityReport>, IoPrioError> {
    COLLECTOR_PROCESSES
        .iter()
        .map(|process| check_process(runner, process))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_best_effort_output() {
        let prio = IoPriority::parse("best-effort: prio 3\n").unwrap();
        assert_eq!(prio, IoPriority::best_effort(3));
        assert_eq!(prio.to_string(), "best-effort: prio 3");
    }

    #[test]
    fn parse_idle_class() {
        let prio = IoPriority::parse("idle: prio 7").unwrap();
        assert_eq!(prio.class, "idle");
        assert_eq!(prio.level, 7);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(IoPriority::parse("").is_none());
        assert!(IoPriority::parse("best-effort").is_none());
        assert!(IoPriority::parse("best-effort: prio x").is_none());
    }
}
