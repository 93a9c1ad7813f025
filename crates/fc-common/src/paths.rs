//! On-device path and service constants.
//!
//! These are facts about the appliance's filesystem layout, shared by the
//! storage client, the backend verifiers, and the mock appliance.

/// Mount point of the remote share on the appliance.
pub const SHARE_ROOT: &str = "/mnt/external";

/// Scratch directory for round-trip test files.
pub const SCRATCH_DIR: &str = "/tmp/proxy_test";

/// Backend storage configuration (KEY="value" pairs).
pub const STORAGE_CFG: &str = "/etc/flowmon/remote-storage.cfg";

/// Autofs/CIFS mount options for the report share.
pub const REPORT_CIFS: &str = "/etc/flowmon/flowmon_remote_report.cifs";

/// CIFS credentials file (key=value lines, root-only).
pub const CREDENTIALS_FILE: &str = "/root/.flowmon_remote_report_credentials";

/// Staging path for configuration documents pushed to the appliance.
pub const IMPORT_STAGING: &str = "/tmp/remote-storage-import.xml";

/// systemd unit controlling the share mount.
pub const RS_SERVICE: &str = "flowmon-remote-storage";

/// Join a file name onto the share mount point.
pub fn share_path(name: &str) -> String {
    format!("{}/{}", SHARE_ROOT, name)
}

/// Join a file name onto the scratch directory.
pub fn scratch_path(name: &str) -> String {
    format!("{}/{}", SCRATCH_DIR, name)
}
