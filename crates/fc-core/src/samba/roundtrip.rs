//! End-to-end share round-trip driver.
//!
//! Proves that a configured share actually stores data: a canary file is
//! written on the appliance, uploaded to the share, the remote-storage
//! service is cycled underneath it, and the file is then read back both
//! through the mounted filesystem and through the `remote_storage`
//! client path. Scratch and share copies are cleaned up on every exit
//! path.

use super::config::{combination_matrix, SambaConfig};
use super::verify::{verify_backend, VerifyError};
use chrono::Utc;
use fc_common::paths;
use fc_remote::exec::{ExecError, Runner};
use fc_remote::files::{self, FileProbeError};
use fc_remote::storage::{RemoteStorage, StorageError};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// Canary payload written through the share and read back.
pub const CANARY: &str = "abcd123";

/// Prefix for round-trip scratch files.
const FILE_PREFIX: &str = "platformautotests_";

/// Errors from the round-trip driver.
#[derive(Debug, Error)]
pub enum RoundTripError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Probe(#[from] FileProbeError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("file {path} has different content: expected {expected:?}, got {actual:?}")]
    ContentMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl From<RoundTripError> for fc_common::Error {
    fn from(e: RoundTripError) -> Self {
        match e {
            RoundTripError::Exec(e) => e.into(),
            RoundTripError::Probe(e) => e.into(),
            RoundTripError::Storage(e) => e.into(),
            RoundTripError::Verify(e) => e.into(),
            other => fc_common::Error::Oracle(other.to_string()),
        }
    }
}

/// Result of one successful round-trip run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTripReport {
    /// Combination under test.
    pub combination: String,

    /// Name of the canary file on the share.
    pub file_name: String,

    /// Total run duration.
    pub duration_ms: u64,
}

/// Per-combination result of a matrix run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationResult {
    pub combination: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Result of running the full combination matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixOutcome {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<CombinationResult>,
}

/// Timestamp-suffixed file name, unique across parametrized runs.
fn unique_file_name() -> String {
    format!(
        "{}{}",
        FILE_PREFIX,
        Utc::now().format("%Y-%m-%d_%H-%M-%S_%s")
    )
}

/// Disable the service, import the configuration, and bring it back up.
pub fn apply_config(runner: &dyn Runner, config: &SambaConfig) -> Result<(), RoundTripError> {
    RemoteStorage::disable(runner)?;
    RemoteStorage::upload_and_import(runner, &config.render_xml())?;
    RemoteStorage::set_state(runner, true)?;
    Ok(())
}

/// Read a file as the appliance user and compare against the canary.
fn assert_canary(runner: &dyn Runner, path: &str) -> Result<(), RoundTripError> {
    let content = files::read_file(runner, path)?;
    if content.trim() != CANARY {
        return Err(RoundTripError::ContentMismatch {
            path: path.to_string(),
            expected: CANARY.to_string(),
            actual: content,
        });
    }
    Ok(())
}

/// The verified steps between setup and cleanup.
fn drive(
    runner: &dyn Runner,
    config: &SambaConfig,
    name: &str,
    local: &str,
) -> Result<(), RoundTripError> {
    // Upload the canary to the share
    apply_config(runner, config)?;
    RemoteStorage::upload(runner, local, name)?;

    // Cycle the service underneath the uploaded file: disable, then
    // re-import without an explicit enable
    RemoteStorage::disable(runner)?;
    RemoteStorage::upload_and_import(runner, &config.render_xml())?;

    // The file must have survived, seen through the mounted filesystem
    let on_share = paths::share_path(name);
    assert_canary(runner, &on_share)?;

    // And through the client utility path
    let downloaded = paths::scratch_path(&format!("{}_download", name));
    RemoteStorage::download(runner, name, &downloaded)?;
    assert_canary(runner, &downloaded)?;

    // Removing it must make subsequent existence checks false
    RemoteStorage::erase(runner, &on_share)?;
    Ok(())
}

/// Run the full round-trip for one configuration.
pub fn run_round_trip(
    runner: &dyn Runner,
    config: &SambaConfig,
) -> Result<RoundTripReport, RoundTripError> {
    let start = Instant::now();
    info!(combination = %config.combination_label(), "starting share round-trip");

    apply_config(runner, config)?;
    verify_backend(runner, config)?;

    let name = unique_file_name();
    let local = paths::scratch_path(&name);
    files::make_dir(runner, paths::SCRATCH_DIR)?;
    files::write_file(runner, &local, CANARY)?;

    let result = drive(runner, config, &name, &local);

    // Cleanup runs on both exit paths; failures here must not mask the
    // primary error
    if let Err(e) = files::remove_path(runner, paths::SCRATCH_DIR) {
        warn!(error = %e, "scratch cleanup failed");
    }
    if result.is_err() {
        if let Err(e) = runner.root_exec(&format!("remote_storage -E {}", name)) {
            warn!(error = %e, "share cleanup failed");
        }
    }

    result.map(|()| RoundTripReport {
        combination: config.combination_label(),
        file_name: name,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Run every (version, authentication, port) combination in both
/// authenticated and anonymous mode against one share.
pub fn run_matrix(runner: &dyn Runner, base: &SambaConfig) -> MatrixOutcome {
    let mut outcome = MatrixOutcome {
        total: 0,
        successful: 0,
        failed: 0,
        results: Vec::new(),
    };

    for (version, auth, port) in combination_matrix() {
        for authenticated in [true, false] {
            let mut config = base.clone().with_combination(version, auth, port);
            if !authenticated {
                config = config.anonymous();
            }

            let start = Instant::now();
            let result = run_round_trip(runner, &config);
            let duration_ms = start.elapsed().as_millis() as u64;

            outcome.total += 1;
            match result {
                Ok(_) => {
                    outcome.successful += 1;
                    outcome.results.push(CombinationResult {
                        combination: config.combination_label(),
                        success: true,
                        error: None,
                        duration_ms,
                    });
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome.results.push(CombinationResult {
                        combination: config.combination_label(),
                        success: false,
                        error: Some(e.to_string()),
                        duration_ms,
                    });
                }
            }
        }
    }
    outcome
}
