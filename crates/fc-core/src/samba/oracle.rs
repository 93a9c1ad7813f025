//! Parsers for the three on-device backend artifacts.
//!
//! Each artifact is written by a different appliance subsystem with its
//! own serialization convention:
//! - the storage config uses quoted `KEY="value"` pairs
//! - the report mount file uses autofs option syntax plus a share location
//! - the credentials file uses bare `key=value` lines
//!
//! The parsers return typed structs; a field the artifact does not carry
//! is an explicit [`OracleError::FieldMissing`], never a panic.

use fc_common::paths;
use regex::Regex;
use thiserror::Error;

/// Errors from artifact parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("{file}: field {field} not found")]
    FieldMissing {
        file: &'static str,
        field: &'static str,
    },
}

fn field<F>(
    file: &'static str,
    name: &'static str,
    lookup: F,
) -> Result<String, OracleError>
where
    F: FnOnce() -> Option<String>,
{
    lookup().ok_or(OracleError::FieldMissing { file, field: name })
}

// ============================================================================
// Storage config: KEY="value" pairs
// ============================================================================

/// Parsed `/etc/flowmon/remote-storage.cfg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCfg {
    pub enabled: String,
    pub protocol: String,
    pub protocol_version: String,
    pub authentication: String,
    pub ip: String,
    pub port: String,
    pub root_dir: String,
    pub domain: String,
    /// Empty or absent for anonymous configurations.
    pub user: Option<String>,
}

/// Extract one quoted `KEY="value"` assignment.
fn quoted_value(content: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(r#"(?m)^{}="([^"]*)""#, key)).ok()?;
    Some(re.captures(content)?[1].to_string())
}

impl StorageCfg {
    pub fn parse(content: &str) -> Result<Self, OracleError> {
        const FILE: &str = paths::STORAGE_CFG;
        Ok(StorageCfg {
            enabled: field(FILE, "ENABLED", || quoted_value(content, "ENABLED"))?,
            protocol: field(FILE, "PROTOCOL", || quoted_value(content, "PROTOCOL"))?,
            protocol_version: field(FILE, "PROTOCOL_VERSION", || {
                quoted_value(content, "PROTOCOL_VERSION")
            })?,
            authentication: field(FILE, "AUTHENTICATION", || {
                quoted_value(content, "AUTHENTICATION")
            })?,
            ip: field(FILE, "IP", || quoted_value(content, "IP"))?,
            port: field(FILE, "PORT", || quoted_value(content, "PORT"))?,
            root_dir: field(FILE, "ROOT_DIR", || quoted_value(content, "ROOT_DIR"))?,
            domain: field(FILE, "DOMAIN", || quoted_value(content, "DOMAIN"))?,
            user: quoted_value(content, "USER").filter(|user| !user.is_empty()),
        })
    }
}

// ============================================================================
// Report mount file: autofs option syntax
// ============================================================================

/// Parsed `/etc/flowmon/flowmon_remote_report.cifs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    pub fstype: String,
    pub vers: String,
    pub sec: String,
    pub port: String,
    pub ip: String,
    pub root: String,
}

/// Extract one comma-terminated `key=value` mount option.
fn mount_option(content: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(r"{}=([^,\s]+),", key)).ok()?;
    Some(re.captures(content)?[1].to_string())
}

impl MountOptions {
    pub fn parse(content: &str) -> Result<Self, OracleError> {
        const FILE: &str = paths::REPORT_CIFS;

        let location = Regex::new(r"://([^/\s]+)/(\S+)")
            .ok()
            .and_then(|re| {
                let caps = re.captures(content)?;
                Some((caps[1].to_string(), caps[2].to_string()))
            });

        Ok(MountOptions {
            fstype: field(FILE, "-fstype", || mount_option(content, "-fstype"))?,
            vers: field(FILE, "vers", || mount_option(content, "vers"))?,
            sec: field(FILE, "sec", || mount_option(content, "sec"))?,
            port: field(FILE, "port", || mount_option(content, "port"))?,
            ip: field(FILE, "location ip", || {
                location.as_ref().map(|(ip, _)| ip.clone())
            })?,
            root: field(FILE, "location root", || {
                location.as_ref().map(|(_, root)| root.clone())
            })?,
        })
    }
}

// ============================================================================
// Credentials file: key=value lines
// ============================================================================

/// Parsed `/root/.flowmon_remote_report_credentials`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsFile {
    pub domain: String,
    /// Absent for anonymous configurations.
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Extract one `key=value` line.
fn line_value(content: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?m)^{}=(.*)$", key)).ok()?;
    Some(re.captures(content)?[1].trim_end().to_string())
}

impl CredentialsFile {
    pub fn parse(content: &str) -> Result<Self, OracleError> {
        const FILE: &str = paths::CREDENTIALS_FILE;
        Ok(CredentialsFile {
            domain: field(FILE, "domain", || line_value(content, "domain"))?,
            username: line_value(content, "username"),
            password: line_value(content, "password"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORAGE_SAMPLE: &str = r#"# Generated by flowmon-config
ENABLED="1"
PROTOCOL="cifs"
PROTOCOL_VERSION="2.1"
AUTHENTICATION="ntlmv2"
IP="192.168.4.156"
PORT="448"
ROOT_DIR="share"
DOMAIN="WORKGROUP"
USER="qauser"
"#;

    const CIFS_SAMPLE: &str =
        "flowmon_remote_report -fstype=cifs,vers=2.1,sec=ntlmv2,port=448,rw ://192.168.4.156/share\n";

    const CREDS_SAMPLE: &str = "domain=WORKGROUP\nusername=qauser\npassword=qa\n";

    #[test]
    fn storage_cfg_full_parse() {
        let cfg = StorageCfg::parse(STORAGE_SAMPLE).unwrap();
        assert_eq!(cfg.enabled, "1");
        assert_eq!(cfg.protocol, "cifs");
        assert_eq!(cfg.protocol_version, "2.1");
        assert_eq!(cfg.authentication, "ntlmv2");
        assert_eq!(cfg.ip, "192.168.4.156");
        assert_eq!(cfg.port, "448");
        assert_eq!(cfg.root_dir, "share");
        assert_eq!(cfg.domain, "WORKGROUP");
        assert_eq!(cfg.user.as_deref(), Some("qauser"));
    }

    #[test]
    fn storage_cfg_empty_user_is_none() {
        let content = STORAGE_SAMPLE.replace("USER=\"qauser\"", "USER=\"\"");
        let cfg = StorageCfg::parse(&content).unwrap();
        assert_eq!(cfg.user, None);
    }

    #[test]
    fn storage_cfg_missing_field_is_explicit() {
        let content = STORAGE_SAMPLE.replace("PORT=\"448\"\n", "");
        let err = StorageCfg::parse(&content).unwrap_err();
        assert_eq!(
            err,
            OracleError::FieldMissing {
                file: paths::STORAGE_CFG,
                field: "PORT"
            }
        );
    }

    #[test]
    fn mount_options_full_parse() {
        let opts = MountOptions::parse(CIFS_SAMPLE).unwrap();
        assert_eq!(opts.fstype, "cifs");
        assert_eq!(opts.vers, "2.1");
        assert_eq!(opts.sec, "ntlmv2");
        assert_eq!(opts.port, "448");
        assert_eq!(opts.ip, "192.168.4.156");
        assert_eq!(opts.root, "share");
    }

    #[test]
    fn mount_options_missing_location() {
        let err = MountOptions::parse("x -fstype=cifs,vers=1.0,sec=ntlm,port=445,rw\n").unwrap_err();
        assert_eq!(
            err,
            OracleError::FieldMissing {
                file: paths::REPORT_CIFS,
                field: "location ip"
            }
        );
    }

    #[test]
    fn credentials_full_parse() {
        let creds = CredentialsFile::parse(CREDS_SAMPLE).unwrap();
        assert_eq!(creds.domain, "WORKGROUP");
        assert_eq!(creds.username.as_deref(), Some("qauser"));
        assert_eq!(creds.password.as_deref(), Some("qa"));
    }

    #[test]
    fn credentials_anonymous_has_domain_only() {
        let creds = CredentialsFile::parse("domain=WORKGROUP\n").unwrap();
        assert_eq!(creds.domain, "WORKGROUP");
        assert_eq!(creds.username, None);
        assert_eq!(creds.password, None);
    }

    #[test]
    fn credentials_missing_domain_is_explicit() {
        let err = CredentialsFile::parse("username=qauser\n").unwrap_err();
        assert!(matches!(err, OracleError::FieldMissing { field: "domain", .. }));
    }
}
