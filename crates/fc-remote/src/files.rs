//! Remote file probes.
//!
//! Small helpers over the exec channel for checking and moving file
//! content on the appliance: size, existence, read, write, remove. The
//! backend verifiers and the round-trip driver are built on these.

use crate::exec::{ExecError, Runner};
use thiserror::Error;

/// Errors from remote file probes.
#[derive(Debug, Error)]
pub enum FileProbeError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("failed to read {path}: {stderr}")]
    ReadFailed { path: String, stderr: String },

    #[error("failed to write {path}: {stderr}")]
    WriteFailed { path: String, stderr: String },

    #[error("unexpected stat output for {path}: {output:?}")]
    StatParse { path: String, output: String },
}

impl From<FileProbeError> for fc_common::Error {
    fn from(e: FileProbeError) -> Self {
        match e {
            FileProbeError::Exec(e) => e.into(),
            other => fc_common::Error::Exec(other.to_string()),
        }
    }
}

/// Size of a remote file in bytes. A missing file reports 0.
pub fn file_size(runner: &dyn Runner, path: &str) -> Result<u64, FileProbeError> {
    let out = runner.root_exec(&format!("stat -c %s {}", path))?;
    if !out.success() {
        // stat fails when the file is absent
        return Ok(0);
    }
    out.stdout_trimmed()
        .parse::<u64>()
        .map_err(|_| FileProbeError::StatParse {
            path: path.to_string(),
            output: out.stdout_trimmed().to_string(),
        })
}

/// Whether a remote path exists.
pub fn file_exists(runner: &dyn Runner, path: &str) -> Result<bool, FileProbeError> {
    let out = runner.exec(&format!("test -e {}", path))?;
    Ok(out.success())
}

/// Read a remote file as the appliance user.
pub fn read_file(runner: &dyn Runner, path: &str) -> Result<String, FileProbeError> {
    let out = runner.exec(&format!("cat {}", path))?;
    if !out.success() {
        return Err(FileProbeError::ReadFailed {
            path: path.to_string(),
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(out.stdout)
}

/// Read a remote file with root privileges (backend configs, credentials).
pub fn read_file_root(runner: &dyn Runner, path: &str) -> Result<String, FileProbeError> {
    let out = runner.root_exec(&format!("cat {}", path))?;
    if !out.success() {
        return Err(FileProbeError::ReadFailed {
            path: path.to_string(),
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(out.stdout)
}

/// Create a directory (and parents) on the appliance.
pub fn make_dir(runner: &dyn Runner, path: &str) -> Result<(), FileProbeError> {
    let out = runner.exec(&format!("mkdir -p {}", path))?;
    if !out.success() {
        return Err(FileProbeError::WriteFailed {
            path: path.to_string(),
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Write a single-line file on the appliance via shell redirection.
pub fn write_file(runner: &dyn Runner, path: &str, content: &str) -> Result<(), FileProbeError> {
    let out = runner.exec(&format!("echo \"{}\" > {}", content, path))?;
    if !out.success() {
        return Err(FileProbeError::WriteFailed {
            path: path.to_string(),
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Remove a remote path recursively. Missing paths are not an error.
pub fn remove_path(runner: &dyn Runner, path: &str) -> Result<(), FileProbeError> {
    runner.exec(&format!("rm -rf {}", path))?;
    Ok(())
}
