//! Remote-storage service client.
//!
//! This module drives the appliance's remote-storage subsystem from
//! outside:
//! - Service state control via the systemd unit
//! - Configuration import (push an XML document and apply it)
//! - Share transfers through the on-device `remote_storage` utility
//!   (`-T` upload, `-F` download, `-E` erase)
//!
//! None of the storage machinery itself is implemented here; every
//! operation shells out to the appliance and checks its observable
//! outcome.

use crate::exec::{ExecError, Runner};
use crate::files::{self, FileProbeError};
use fc_common::paths;
use thiserror::Error;
use tracing::{debug, info};

/// Heredoc delimiter for staged configuration documents.
const IMPORT_EOF: &str = "FCEOF";

/// Errors from remote-storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Probe(#[from] FileProbeError),

    #[error("failed to {action} service {unit}: {stderr}")]
    ServiceControl {
        action: &'static str,
        unit: String,
        stderr: String,
    },

    #[error("service {unit} is {actual}, expected {expected}")]
    ServiceState {
        unit: String,
        expected: String,
        actual: String,
    },

    #[error("staged configuration document at {path} is empty")]
    EmptyImport { path: String },

    #[error("configuration import failed: {stderr}")]
    ImportFailed { stderr: String },

    #[error("remote_storage {op} failed: {stderr}")]
    TransferFailed { op: &'static str, stderr: String },

    #[error("uploaded file {path} is empty on the share")]
    UploadedEmpty { path: String },

    #[error("file {path} still exists on the share after erase")]
    StillExists { path: String },
}

impl From<StorageError> for fc_common::Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Exec(e) => e.into(),
            StorageError::Probe(e) => e.into(),
            other => fc_common::Error::Storage(other.to_string()),
        }
    }
}

/// Client for the appliance's remote-storage subsystem.
///
/// All methods are stateless; the appliance's own configuration is the
/// only state, and each check re-applies it from scratch.
pub struct RemoteStorage;

impl RemoteStorage {
    /// Stop the share-mount service.
    pub fn disable(runner: &dyn Runner) -> Result<(), StorageError> {
        debug!(unit = paths::RS_SERVICE, "stopping remote-storage service");
        let out = runner.root_exec(&format!("systemctl stop {}", paths::RS_SERVICE))?;
        if !out.success() {
            return Err(StorageError::ServiceControl {
                action: "stop",
                unit: paths::RS_SERVICE.to_string(),
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Start or stop the share-mount service and confirm the state took.
    pub fn set_state(runner: &dyn Runner, enabled: bool) -> Result<(), StorageError> {
        let action: &'static str = if enabled { "start" } else { "stop" };
        let out = runner.root_exec(&format!("systemctl {} {}", action, paths::RS_SERVICE))?;
        if !out.success() {
            return Err(StorageError::ServiceControl {
                action,
                unit: paths::RS_SERVICE.to_string(),
                stderr: out.stderr.trim().to_string(),
            });
        }

        let expected = if enabled { "active" } else { "inactive" };
        let state = runner.root_exec(&format!("systemctl is-active {}", paths::RS_SERVICE))?;
        let actual = state.stdout_trimmed();
        if actual != expected {
            return Err(StorageError::ServiceState {
                unit: paths::RS_SERVICE.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Push a configuration document to the appliance and apply it.
    ///
    /// The document is staged under /tmp, checked for non-emptiness, and
    /// handed to the appliance's configuration importer. Applying the
    /// configuration re-establishes the share mount.
    pub fn upload_and_import(runner: &dyn Runner, xml: &str) -> Result<(), StorageError> {
        let staging = paths::IMPORT_STAGING;
        let heredoc = format!("cat > {} <<'{}'\n{}\n{}", staging, IMPORT_EOF, xml, IMPORT_EOF);
        let out = runner.exec(&heredoc)?;
        if !out.success() {
            return Err(StorageError::ImportFailed {
                stderr: out.stderr.trim().to_string(),
            });
        }

        if files::file_size(runner, staging)? == 0 {
            return Err(StorageError::EmptyImport {
                path: staging.to_string(),
            });
        }

        info!(path = staging, "importing remote-storage configuration");
        let out = runner.root_exec(&format!("flowmon-config import {}", staging))?;
        if !out.success() {
            return Err(StorageError::ImportFailed {
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Copy a file from the appliance filesystem to the share.
    ///
    /// The uploaded copy must be non-empty; an empty copy means the
    /// transfer silently dropped the content.
    pub fn upload(runner: &dyn Runner, local_path: &str, dest_name: &str) -> Result<(), StorageError> {
        let out = runner.root_exec(&format!(
            "remote_storage -T -S {} -D {}",
            local_path, dest_name
        ))?;
        if !out.success() {
            return Err(StorageError::TransferFailed {
                op: "upload",
                stderr: out.stderr.trim().to_string(),
            });
        }

        let on_share = paths::share_path(dest_name);
        if files::file_size(runner, &on_share)? == 0 {
            return Err(StorageError::UploadedEmpty { path: on_share });
        }
        Ok(())
    }

    /// Copy a file from the share to a path on the appliance filesystem.
    pub fn download(runner: &dyn Runner, share_name: &str, dest_path: &str) -> Result<(), StorageError> {
        let out = runner.root_exec(&format!(
            "remote_storage -F -S {} -D {}",
            share_name, dest_path
        ))?;
        if !out.success() {
            return Err(StorageError::TransferFailed {
                op: "download",
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Remove a file from the share and confirm it is gone.
    ///
    /// Accepts the full share path; the utility itself takes the bare name.
    pub fn erase(runner: &dyn Runner, share_file: &str) -> Result<(), StorageError> {
        let name = share_file.rsplit('/').next().unwrap_or(share_file);
        let out = runner.root_exec(&format!("remote_storage -E {}", name))?;
        if !out.success() {
            return Err(StorageError::TransferFailed {
                op: "erase",
                stderr: out.stderr.trim().to_string(),
            });
        }

        if files::file_exists(runner, share_file)? {
            return Err(StorageError::StillExists {
                path: share_file.to_string(),
            });
        }
        Ok(())
    }
}
