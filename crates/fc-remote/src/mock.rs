//! Mock appliance for testing.
//!
//! This module provides a scriptable in-memory stand-in for the device
//! under test. It implements [`Runner`] by interpreting the exact command
//! vocabulary the checks emit and keeping the corresponding device state:
//!
//! - Running processes and their per-PID IO priority
//! - A path → content filesystem map
//! - The share content and the mount service state
//! - The applied remote-storage configuration, rendered into the three
//!   backend artifacts the way the real appliance does
//!
//! # Example
//!
//! ```ignore
//! use fc_remote::mock::MockApplianceBuilder;
//!
//! let dut = MockApplianceBuilder::new()
//!     .with_process("nfcapd", &[2101, 2102])
//!     .build();
//! ```

use crate::exec::{ExecError, ExecOutput, Runner};
use fc_common::paths;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Default best-effort priority level for freshly spawned processes.
const DEFAULT_IO_LEVEL: u8 = 4;

/// Heredoc delimiter used by the storage client when staging documents.
const IMPORT_EOF: &str = "FCEOF";

// ============================================================================
// Applied configuration
// ============================================================================

/// Remote-storage configuration as extracted from an imported document.
#[derive(Debug, Clone, Default)]
pub struct AppliedConfig {
    pub enabled: String,
    pub protocol: String,
    pub protocol_version: String,
    pub authentication: String,
    pub ip: String,
    pub port: String,
    pub root: String,
    pub domain: String,
    pub login: Option<String>,
    pub password: Option<String>,
}

impl AppliedConfig {
    /// Extract tag values from an import document.
    fn from_xml(xml: &str) -> Self {
        let tag = |name: &str| -> Option<String> {
            let re = Regex::new(&format!("<{0}>([^<]*)</{0}>", name)).ok()?;
            re.captures(xml).map(|c| c[1].to_string())
        };
        AppliedConfig {
            enabled: tag("enabled").unwrap_or_default(),
            protocol: tag("protocol").unwrap_or_default(),
            protocol_version: tag("protocolVersion").unwrap_or_default(),
            authentication: tag("authentication").unwrap_or_default(),
            ip: tag("ip").unwrap_or_default(),
            port: tag("port").unwrap_or_default(),
            root: tag("root").unwrap_or_default(),
            domain: tag("domain").unwrap_or_default(),
            login: tag("login"),
            password: tag("password"),
        }
    }

    /// Render the backend storage configuration file.
    fn render_storage_cfg(&self) -> String {
        let mut out = String::from("# Generated by flowmon-config\n");
        out.push_str(&format!("ENABLED=\"{}\"\n", self.enabled));
        out.push_str(&format!("PROTOCOL=\"{}\"\n", self.protocol));
        out.push_str(&format!("PROTOCOL_VERSION=\"{}\"\n", self.protocol_version));
        out.push_str(&format!("AUTHENTICATION=\"{}\"\n", self.authentication));
        out.push_str(&format!("IP=\"{}\"\n", self.ip));
        out.push_str(&format!("PORT=\"{}\"\n", self.port));
        out.push_str(&format!("ROOT_DIR=\"{}\"\n", self.root));
        out.push_str(&format!("DOMAIN=\"{}\"\n", self.domain));
        out.push_str(&format!(
            "USER=\"{}\"\n",
            self.login.as_deref().unwrap_or("")
        ));
        out
    }

    /// Render the autofs/CIFS mount options line.
    fn render_report_cifs(&self) -> String {
        format!(
            "flowmon_remote_report -fstype={},vers={},sec={},port={},rw ://{}/{}\n",
            self.protocol, self.protocol_version, self.authentication, self.port, self.ip, self.root
        )
    }

    /// Render the credentials file. Anonymous configs carry only the domain.
    fn render_credentials(&self) -> String {
        let mut out = format!("domain={}\n", self.domain);
        if let Some(ref login) = self.login {
            out.push_str(&format!("username={}\n", login));
        }
        if let Some(ref password) = self.password {
            out.push_str(&format!("password={}\n", password));
        }
        out
    }
}

// ============================================================================
// Appliance state
// ============================================================================

#[derive(Debug, Default)]
struct State {
    /// Process name → PIDs.
    processes: BTreeMap<String, Vec<u32>>,
    /// PID → best-effort IO priority level.
    io_priority: BTreeMap<u32, u8>,
    /// Appliance filesystem, path → content.
    fs: BTreeMap<String, String>,
    /// Share content, bare name → content.
    share: BTreeMap<String, String>,
    /// Whether the share mount service is active.
    service_active: bool,
    /// Last imported configuration, if any.
    config: Option<AppliedConfig>,
    /// Every command executed, in order.
    command_log: Vec<String>,
}

/// In-memory appliance implementing [`Runner`].
#[derive(Debug)]
pub struct MockAppliance {
    state: Mutex<State>,
}

/// Builder for [`MockAppliance`].
#[derive(Debug, Default)]
pub struct MockApplianceBuilder {
    state: State,
}

impl MockApplianceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running process with the given PIDs.
    pub fn with_process(mut self, name: &str, pids: &[u32]) -> Self {
        for pid in pids {
            self.state.io_priority.insert(*pid, DEFAULT_IO_LEVEL);
        }
        self.state.processes.insert(name.to_string(), pids.to_vec());
        self
    }

    /// Seed a file on the appliance filesystem.
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.state.fs.insert(path.to_string(), content.to_string());
        self
    }

    pub fn build(self) -> MockAppliance {
        MockAppliance {
            state: Mutex::new(self.state),
        }
    }
}

impl MockAppliance {
    // ------------------------------------------------------------------
    // Test inspection helpers
    // ------------------------------------------------------------------

    /// Best-effort priority level currently set for a PID.
    pub fn io_priority_of(&self, pid: u32) -> Option<u8> {
        self.state.lock().unwrap().io_priority.get(&pid).copied()
    }

    /// Whether the share currently holds a file with this bare name.
    pub fn share_contains(&self, name: &str) -> bool {
        self.state.lock().unwrap().share.contains_key(name)
    }

    /// Whether the mount service is active.
    pub fn is_service_active(&self) -> bool {
        self.state.lock().unwrap().service_active
    }

    /// Every command executed so far, in order.
    pub fn command_log(&self) -> Vec<String> {
        self.state.lock().unwrap().command_log.clone()
    }

    // ------------------------------------------------------------------
    // Command interpretation
    // ------------------------------------------------------------------

    fn dispatch(&self, command: &str, root: bool) -> ExecOutput {
        let mut state = self.state.lock().unwrap();
        state.command_log.push(command.to_string());

        if let Some(rest) = command.strip_prefix("ps -C ") {
            return Self::cmd_ps(&state, rest);
        }
        if let Some(rest) = command.strip_prefix("ionice -p ") {
            return Self::cmd_ionice(&mut state, rest, root);
        }
        if command.starts_with("cat > ") {
            return Self::cmd_heredoc_write(&mut state, command);
        }
        if let Some(path) = command.strip_prefix("cat ") {
            return Self::cmd_cat(&state, path.trim(), root);
        }
        if let Some(path) = command.strip_prefix("stat -c %s ") {
            return Self::cmd_stat(&state, path.trim(), root);
        }
        if let Some(path) = command.strip_prefix("test -e ") {
            return Self::cmd_test_exists(&state, path.trim());
        }
        if command.strip_prefix("mkdir -p ").is_some() {
            return ok("");
        }
        if command.starts_with("echo \"") {
            return Self::cmd_echo_write(&mut state, command);
        }
        if let Some(path) = command.strip_prefix("rm -rf ") {
            return Self::cmd_rm(&mut state, path.trim());
        }
        if let Some(rest) = command.strip_prefix("systemctl ") {
            return Self::cmd_systemctl(&mut state, rest, root);
        }
        if let Some(path) = command.strip_prefix("flowmon-config import ") {
            return Self::cmd_import(&mut state, path.trim(), root);
        }
        if let Some(rest) = command.strip_prefix("remote_storage ") {
            return Self::cmd_remote_storage(&mut state, rest, root);
        }

        fail(127, &format!("sh: {}: command not found", command))
    }

    fn cmd_ps(state: &State, rest: &str) -> ExecOutput {
        // ps -C <name> -o pid=
        let name = rest.trim_end_matches(" -o pid=").trim();
        match state.processes.get(name) {
            Some(pids) if !pids.is_empty() => {
                let mut out = String::new();
                for pid in pids {
                    out.push_str(&format!("{:>5}\n", pid));
                }
                ok(&out)
            }
            // ps exits 1 when no processes match
            _ => fail(1, ""),
        }
    }

    fn cmd_ionice(state: &mut State, rest: &str, root: bool) -> ExecOutput {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let pid: u32 = match parts.first().and_then(|p| p.parse().ok()) {
            Some(pid) => pid,
            None => return fail(1, "ionice: invalid PID argument"),
        };
        if !state.io_priority.contains_key(&pid) {
            return fail(1, &format!("ionice: failed to get pid {} io prio: No such process", pid));
        }

        match parts.get(1) {
            // ionice -p <pid> -n <level>
            Some(&"-n") => {
                if !root {
                    return fail(1, "ionice: failed to set pid io prio: Operation not permitted");
                }
                let level: u8 = match parts.get(2).and_then(|l| l.parse().ok()) {
                    Some(level) if level <= 7 => level,
                    _ => return fail(1, "ionice: invalid class data argument"),
                };
                state.io_priority.insert(pid, level);
                ok("")
            }
            // ionice -p <pid>
            None => {
                let level = state.io_priority[&pid];
                ok(&format!("best-effort: prio {}\n", level))
            }
            Some(other) => fail(1, &format!("ionice: unknown argument: {}", other)),
        }
    }

    fn cmd_heredoc_write(state: &mut State, command: &str) -> ExecOutput {
        // cat > <path> <<'FCEOF'\n<content>\nFCEOF
        let marker = format!(" <<'{}'\n", IMPORT_EOF);
        let Some(heredoc_at) = command.find(&marker) else {
            return fail(2, "sh: syntax error near unexpected token");
        };
        let path = command["cat > ".len()..heredoc_at].trim().to_string();
        let body = &command[heredoc_at + marker.len()..];
        let Some(content) = body.strip_suffix(&format!("\n{}", IMPORT_EOF)) else {
            return fail(2, "sh: here-document delimited by end-of-file");
        };
        state.fs.insert(path, format!("{}\n", content));
        ok("")
    }

    fn cmd_echo_write(state: &mut State, command: &str) -> ExecOutput {
        // echo "<content>" > <path>
        let rest = &command["echo \"".len()..];
        let Some(quote_at) = rest.find("\" > ") else {
            return fail(2, "sh: syntax error");
        };
        let content = &rest[..quote_at];
        let path = rest[quote_at + "\" > ".len()..].trim().to_string();
        state.fs.insert(path, format!("{}\n", content));
        ok("")
    }

    /// Resolve a path for reading, honoring share mount state and the
    /// root-only backend files.
    fn resolve_read<'a>(state: &'a State, path: &str, root: bool) -> Result<&'a str, ExecOutput> {
        let root_only = path.starts_with("/root/") || path.starts_with("/etc/flowmon/");
        if root_only && !root {
            return Err(fail(1, &format!("cat: {}: Permission denied", path)));
        }

        if let Some(name) = path.strip_prefix(&format!("{}/", paths::SHARE_ROOT)) {
            if !state.service_active {
                return Err(fail(1, &format!("cat: {}: No such file or directory", path)));
            }
            return state
                .share
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| fail(1, &format!("cat: {}: No such file or directory", path)));
        }

        state
            .fs
            .get(path)
            .map(String::as_str)
            .ok_or_else(|| fail(1, &format!("cat: {}: No such file or directory", path)))
    }

    fn cmd_cat(state: &State, path: &str, root: bool) -> ExecOutput {
        match Self::resolve_read(state, path, root) {
            Ok(content) => ok(content),
            Err(out) => out,
        }
    }

    fn cmd_stat(state: &State, path: &str, root: bool) -> ExecOutput {
        match Self::resolve_read(state, path, root) {
            Ok(content) => ok(&format!("{}\n", content.len())),
            Err(_) => fail(1, &format!("stat: cannot statx '{}': No such file or directory", path)),
        }
    }

    fn cmd_test_exists(state: &State, path: &str) -> ExecOutput {
        match Self::resolve_read(state, path, true) {
            Ok(_) => ok(""),
            Err(_) => fail(1, ""),
        }
    }

    fn cmd_rm(state: &mut State, path: &str) -> ExecOutput {
        let prefix = format!("{}/", path);
        state.fs.retain(|p, _| p != path && !p.starts_with(&prefix));
        ok("")
    }

    fn cmd_systemctl(state: &mut State, rest: &str, root: bool) -> ExecOutput {
        if !root {
            return fail(1, "Access denied");
        }
        let mut parts = rest.split_whitespace();
        let verb = parts.next().unwrap_or("");
        let unit = parts.next().unwrap_or("");
        if unit != paths::RS_SERVICE {
            return fail(5, &format!("Unit {}.service not loaded.", unit));
        }
        match verb {
            "stop" => {
                state.service_active = false;
                ok("")
            }
            "start" => {
                if state.config.is_none() {
                    return fail(1, &format!("Job for {}.service failed.", unit));
                }
                state.service_active = true;
                ok("")
            }
            "is-active" => {
                // systemctl prints the state on stdout even when inactive
                if state.service_active {
                    ok("active\n")
                } else {
                    ExecOutput {
                        exit_code: Some(3),
                        stdout: "inactive\n".to_string(),
                        stderr: String::new(),
                    }
                }
            }
            _ => fail(1, &format!("Unknown command verb {}.", verb)),
        }
    }

    fn cmd_import(state: &mut State, path: &str, root: bool) -> ExecOutput {
        if !root {
            return fail(1, "flowmon-config: permission denied");
        }
        let Some(xml) = state.fs.get(path).cloned() else {
            return fail(1, &format!("flowmon-config: cannot open {}", path));
        };
        let config = AppliedConfig::from_xml(&xml);
        state
            .fs
            .insert(paths::STORAGE_CFG.to_string(), config.render_storage_cfg());
        state
            .fs
            .insert(paths::REPORT_CIFS.to_string(), config.render_report_cifs());
        state.fs.insert(
            paths::CREDENTIALS_FILE.to_string(),
            config.render_credentials(),
        );
        state.config = Some(config);
        // Applying the configuration re-establishes the mount
        state.service_active = true;
        ok("")
    }

    fn cmd_remote_storage(state: &mut State, rest: &str, root: bool) -> ExecOutput {
        if !root {
            return fail(1, "remote_storage: permission denied");
        }
        if !state.service_active {
            return fail(1, "remote_storage: remote storage is not available");
        }
        let parts: Vec<&str> = rest.split_whitespace().collect();
        match parts.as_slice() {
            // Upload: -T -S <local> -D <share name>
            ["-T", "-S", src, "-D", dst] => {
                let Some(content) = state.fs.get(*src).cloned() else {
                    return fail(1, &format!("remote_storage: cannot open {}", src));
                };
                state.share.insert((*dst).to_string(), content);
                ok("")
            }
            // Download: -F -S <share name> -D <local>
            ["-F", "-S", src, "-D", dst] => {
                let Some(content) = state.share.get(*src).cloned() else {
                    return fail(1, &format!("remote_storage: {} not found on share", src));
                };
                state.fs.insert((*dst).to_string(), content);
                ok("")
            }
            // Erase: -E <share name>
            ["-E", name] => {
                state.share.remove(*name);
                ok("")
            }
            _ => fail(2, "remote_storage: invalid arguments"),
        }
    }
}

impl Runner for MockAppliance {
    fn exec(&self, command: &str) -> Result<ExecOutput, ExecError> {
        Ok(self.dispatch(command, false))
    }

    fn root_exec(&self, command: &str) -> Result<ExecOutput, ExecError> {
        Ok(self.dispatch(command, true))
    }
}

fn ok(stdout: &str) -> ExecOutput {
    ExecOutput {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn fail(code: i32, stderr: &str) -> ExecOutput {
    ExecOutput {
        exit_code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = "<remoteStorage>\n\
        <enabled>1</enabled>\n\
        <protocol>cifs</protocol>\n\
        <protocolVersion>2.1</protocolVersion>\n\
        <authentication>ntlmv2</authentication>\n\
        <ip>192.168.4.156</ip>\n\
        <port>448</port>\n\
        <root>share</root>\n\
        <domain>WORKGROUP</domain>\n\
        <login>qauser</login>\n\
        <password>qa</password>\n\
        </remoteStorage>";

    fn import_sample(dut: &MockAppliance) {
        dut.exec(&format!(
            "cat > {} <<'{}'\n{}\n{}",
            paths::IMPORT_STAGING,
            IMPORT_EOF,
            SAMPLE_XML,
            IMPORT_EOF
        ))
        .unwrap();
        let out = dut
            .root_exec(&format!("flowmon-config import {}", paths::IMPORT_STAGING))
            .unwrap();
        assert!(out.success());
    }

    #[test]
    fn ps_lists_registered_pids() {
        let dut = MockApplianceBuilder::new()
            .with_process("nfcapd", &[2101, 2102])
            .build();
        let out = dut.root_exec("ps -C nfcapd -o pid=").unwrap();
        assert!(out.success());
        let pids: Vec<&str> = out.stdout.split_whitespace().collect();
        assert_eq!(pids, vec!["2101", "2102"]);
    }

    #[test]
    fn ps_unknown_process_exits_nonzero() {
        let dut = MockApplianceBuilder::new().build();
        let out = dut.root_exec("ps -C sfcapd -o pid=").unwrap();
        assert!(!out.success());
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn ionice_set_and_read_back() {
        let dut = MockApplianceBuilder::new()
            .with_process("sfcapd", &[300])
            .build();
        assert!(dut.root_exec("ionice -p 300 -n 3").unwrap().success());
        let out = dut.root_exec("ionice -p 300").unwrap();
        assert_eq!(out.stdout_trimmed(), "best-effort: prio 3");
        assert_eq!(dut.io_priority_of(300), Some(3));
    }

    #[test]
    fn ionice_set_requires_root() {
        let dut = MockApplianceBuilder::new()
            .with_process("sfcapd", &[300])
            .build();
        assert!(!dut.exec("ionice -p 300 -n 3").unwrap().success());
        assert_eq!(dut.io_priority_of(300), Some(DEFAULT_IO_LEVEL));
    }

    #[test]
    fn import_renders_backend_artifacts() {
        let dut = MockApplianceBuilder::new().build();
        import_sample(&dut);

        let cfg = dut
            .root_exec(&format!("cat {}", paths::STORAGE_CFG))
            .unwrap();
        assert!(cfg.stdout.contains("PROTOCOL_VERSION=\"2.1\""));
        assert!(cfg.stdout.contains("USER=\"qauser\""));

        let cifs = dut
            .root_exec(&format!("cat {}", paths::REPORT_CIFS))
            .unwrap();
        assert!(cifs.stdout.contains("vers=2.1,sec=ntlmv2,port=448"));
        assert!(cifs.stdout.contains("://192.168.4.156/share"));

        let creds = dut
            .root_exec(&format!("cat {}", paths::CREDENTIALS_FILE))
            .unwrap();
        assert!(creds.stdout.contains("username=qauser\n"));
        assert!(creds.stdout.contains("password=qa\n"));
        assert!(dut.is_service_active());
    }

    #[test]
    fn backend_files_require_root() {
        let dut = MockApplianceBuilder::new().build();
        import_sample(&dut);
        let out = dut
            .exec(&format!("cat {}", paths::CREDENTIALS_FILE))
            .unwrap();
        assert!(!out.success());
        assert!(out.stderr.contains("Permission denied"));
    }

    #[test]
    fn share_visibility_follows_service_state() {
        let dut = MockApplianceBuilder::new().build();
        import_sample(&dut);

        dut.exec("echo \"abcd123\" > /tmp/proxy_test/f1").unwrap();
        assert!(dut
            .root_exec("remote_storage -T -S /tmp/proxy_test/f1 -D f1")
            .unwrap()
            .success());

        let mounted = dut.exec("cat /mnt/external/f1").unwrap();
        assert_eq!(mounted.stdout_trimmed(), "abcd123");

        // Stopping the service unmounts the share without dropping content
        dut.root_exec("systemctl stop flowmon-remote-storage")
            .unwrap();
        assert!(!dut.exec("cat /mnt/external/f1").unwrap().success());
        assert!(dut.share_contains("f1"));

        // Re-import mounts it again
        dut.root_exec(&format!("flowmon-config import {}", paths::IMPORT_STAGING))
            .unwrap();
        assert_eq!(
            dut.exec("cat /mnt/external/f1").unwrap().stdout_trimmed(),
            "abcd123"
        );
    }

    #[test]
    fn download_and_erase_round_trip() {
        let dut = MockApplianceBuilder::new().build();
        import_sample(&dut);

        dut.exec("echo \"abcd123\" > /tmp/proxy_test/f2").unwrap();
        dut.root_exec("remote_storage -T -S /tmp/proxy_test/f2 -D f2")
            .unwrap();

        assert!(dut
            .root_exec("remote_storage -F -S f2 -D /tmp/proxy_test/back")
            .unwrap()
            .success());
        assert_eq!(
            dut.exec("cat /tmp/proxy_test/back").unwrap().stdout_trimmed(),
            "abcd123"
        );

        dut.root_exec("remote_storage -E f2").unwrap();
        assert!(!dut.share_contains("f2"));
        assert!(!dut.exec("test -e /mnt/external/f2").unwrap().success());
    }

    #[test]
    fn command_log_records_order() {
        let dut = MockApplianceBuilder::new()
            .with_process("xfcapd-streamd", &[40])
            .build();
        dut.root_exec("ionice -p 40 -n 0").unwrap();
        dut.root_exec("ionice -p 40").unwrap();
        let log = dut.command_log();
        assert_eq!(log, vec!["ionice -p 40 -n 0", "ionice -p 40"]);
    }
}
