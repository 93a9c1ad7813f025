//! Backend artifact verification.
//!
//! After a configuration import, three independently produced files on
//! the appliance must agree with the document that was pushed. Every
//! comparison failure embeds the full observed file content, since the
//! artifact on a failing device is the only evidence worth having.

use super::config::{ExpectedConfig, SambaConfig};
use super::oracle::{CredentialsFile, MountOptions, OracleError, StorageCfg};
use fc_common::paths;
use fc_remote::exec::{ExecError, Runner};
use fc_remote::files::{self, FileProbeError};
use thiserror::Error;
use tracing::debug;

/// Errors from backend verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Probe(#[from] FileProbeError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("artifact {path} is missing or empty")]
    EmptyArtifact { path: String },

    #[error(
        "{file}: {field} mismatch, expected {expected:?}, got {actual:?}; file content is: {content}"
    )]
    Mismatch {
        file: &'static str,
        field: &'static str,
        expected: String,
        actual: String,
        content: String,
    },
}

impl From<VerifyError> for fc_common::Error {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::Exec(e) => e.into(),
            VerifyError::Probe(e) => e.into(),
            other => fc_common::Error::Oracle(other.to_string()),
        }
    }
}

/// Compare one field, embedding the artifact content on mismatch.
fn expect_field(
    file: &'static str,
    name: &'static str,
    expected: &str,
    actual: &str,
    content: &str,
) -> Result<(), VerifyError> {
    if actual != expected {
        return Err(VerifyError::Mismatch {
            file,
            field: name,
            expected: expected.to_string(),
            actual: actual.to_string(),
            content: content.to_string(),
        });
    }
    Ok(())
}

/// Fetch an artifact, requiring it to exist and be non-empty.
fn fetch_artifact(runner: &dyn Runner, path: &'static str) -> Result<String, VerifyError> {
    if files::file_size(runner, path)? == 0 {
        return Err(VerifyError::EmptyArtifact {
            path: path.to_string(),
        });
    }
    Ok(files::read_file_root(runner, path)?)
}

/// Verify the storage configuration file against the oracle.
///
/// USER is only asserted for authenticated configurations, and is
/// compared against the configured login.
pub fn check_storage_cfg(
    runner: &dyn Runner,
    expected: &ExpectedConfig,
) -> Result<(), VerifyError> {
    const FILE: &str = paths::STORAGE_CFG;
    let content = fetch_artifact(runner, FILE)?;
    let cfg = StorageCfg::parse(&content)?;

    expect_field(FILE, "ENABLED", &expected.enabled, &cfg.enabled, &content)?;
    expect_field(FILE, "PROTOCOL", &expected.protocol, &cfg.protocol, &content)?;
    expect_field(
        FILE,
        "PROTOCOL_VERSION",
        &expected.protocol_version,
        &cfg.protocol_version,
        &content,
    )?;
    expect_field(
        FILE,
        "AUTHENTICATION",
        &expected.authentication,
        &cfg.authentication,
        &content,
    )?;
    expect_field(FILE, "IP", &expected.ip, &cfg.ip, &content)?;
    expect_field(FILE, "PORT", &expected.port, &cfg.port, &content)?;
    expect_field(FILE, "ROOT_DIR", &expected.root, &cfg.root_dir, &content)?;
    expect_field(FILE, "DOMAIN", &expected.domain, &cfg.domain, &content)?;

    if let Some(ref login) = expected.login {
        let user = cfg.user.ok_or(OracleError::FieldMissing {
            file: FILE,
            field: "USER",
        })?;
        expect_field(FILE, "USER", login, &user, &content)?;
    }
    Ok(())
}

/// Verify the report mount options file against the oracle.
pub fn check_mount_options(
    runner: &dyn Runner,
    expected: &ExpectedConfig,
) -> Result<(), VerifyError> {
    const FILE: &str = paths::REPORT_CIFS;
    let content = fetch_artifact(runner, FILE)?;
    let opts = MountOptions::parse(&content)?;

    expect_field(FILE, "-fstype", &expected.protocol, &opts.fstype, &content)?;
    expect_field(FILE, "vers", &expected.protocol_version, &opts.vers, &content)?;
    expect_field(FILE, "sec", &expected.authentication, &opts.sec, &content)?;
    expect_field(FILE, "port", &expected.port, &opts.port, &content)?;
    expect_field(FILE, "location ip", &expected.ip, &opts.ip, &content)?;
    expect_field(FILE, "location root", &expected.root, &opts.root, &content)?;
    Ok(())
}

/// Verify the credentials file against the oracle.
///
/// Anonymous configurations carry only the domain; username and password
/// must then not be required. Username is compared against the
/// configured login.
pub fn check_credentials(
    runner: &dyn Runner,
    expected: &ExpectedConfig,
) -> Result<(), VerifyError> {
    const FILE: &str = paths::CREDENTIALS_FILE;
    let content = fetch_artifact(runner, FILE)?;
    let creds = CredentialsFile::parse(&content)?;

    expect_field(FILE, "domain", &expected.domain, &creds.domain, &content)?;

    if let Some(ref login) = expected.login {
        let username = creds.username.ok_or(OracleError::FieldMissing {
            file: FILE,
            field: "username",
        })?;
        expect_field(FILE, "username", login, &username, &content)?;

        let password = creds.password.ok_or(OracleError::FieldMissing {
            file: FILE,
            field: "password",
        })?;
        let expected_password = expected.password.as_deref().unwrap_or_default();
        expect_field(FILE, "password", expected_password, &password, &content)?;
    }
    Ok(())
}

/// Verify all three backend artifacts against a configuration.
pub fn verify_backend(runner: &dyn Runner, config: &SambaConfig) -> Result<(), VerifyError> {
    let expected = config.expected();
    debug!(combination = %config.combination_label(), "verifying backend artifacts");
    check_storage_cfg(runner, &expected)?;
    check_mount_options(runner, &expected)?;
    check_credentials(runner, &expected)?;
    Ok(())
}
