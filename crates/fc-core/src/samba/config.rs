//! Remote-storage configuration model.
//!
//! The configuration is built in memory and serialized explicitly into
//! the appliance's import document; the expected-values oracle for the
//! backend artifact checks is derived from the same object, so the
//! document pushed and the values asserted can never drift apart.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Login used by the lab share when authentication is on.
pub const DEFAULT_LOGIN: &str = "qauser";

/// Cleartext password of the lab share account.
pub const DEFAULT_PASSWORD: &str = "qa";

/// SMB dialect selected in the import document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ProtocolVersion {
    #[serde(rename = "1.0")]
    #[value(name = "1.0")]
    V1_0,
    #[serde(rename = "2.0")]
    #[value(name = "2.0")]
    V2_0,
    #[serde(rename = "2.1")]
    #[value(name = "2.1")]
    V2_1,
    #[serde(rename = "3.0")]
    #[value(name = "3.0")]
    V3_0,
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolVersion::V1_0 => write!(f, "1.0"),
            ProtocolVersion::V2_0 => write!(f, "2.0"),
            ProtocolVersion::V2_1 => write!(f, "2.1"),
            ProtocolVersion::V3_0 => write!(f, "3.0"),
        }
    }
}

/// CIFS authentication mode (maps to the mount `sec=` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum AuthMode {
    #[serde(rename = "ntlm")]
    #[value(name = "ntlm")]
    Ntlm,
    #[serde(rename = "ntlmv2")]
    #[value(name = "ntlmv2")]
    NtlmV2,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::Ntlm => write!(f, "ntlm"),
            AuthMode::NtlmV2 => write!(f, "ntlmv2"),
        }
    }
}

/// Share account credentials. Absent for anonymous access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Credentials {
            login: DEFAULT_LOGIN.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}

/// Remote-storage configuration pushed to the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SambaConfig {
    pub enabled: bool,
    pub protocol: String,
    pub protocol_version: ProtocolVersion,
    pub authentication: AuthMode,
    pub ip: String,
    pub port: u16,
    pub root: String,
    pub domain: String,
    /// None selects anonymous access; the import document then carries
    /// no login/password tags.
    pub credentials: Option<Credentials>,
}

impl SambaConfig {
    /// Baseline configuration for a lab share at the given address.
    pub fn for_share(ip: impl Into<String>) -> Self {
        SambaConfig {
            enabled: true,
            protocol: "cifs".to_string(),
            protocol_version: ProtocolVersion::V3_0,
            authentication: AuthMode::NtlmV2,
            ip: ip.into(),
            port: 445,
            root: "share".to_string(),
            domain: "WORKGROUP".to_string(),
            credentials: Some(Credentials::default()),
        }
    }

    /// Select one (version, authentication, port) combination.
    pub fn with_combination(
        mut self,
        version: ProtocolVersion,
        auth: AuthMode,
        port: u16,
    ) -> Self {
        self.protocol_version = version;
        self.authentication = auth;
        self.port = port;
        self
    }

    /// Drop the credentials, switching to anonymous access.
    pub fn anonymous(mut self) -> Self {
        self.credentials = None;
        self
    }

    /// Whether this configuration authenticates against the share.
    pub fn authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Serialize the import document for the appliance.
    pub fn render_xml(&self) -> String {
        fn tag(out: &mut String, name: &str, value: &dyn std::fmt::Display) {
            out.push_str(&format!("  <{0}>{1}</{0}>\n", name, value));
        }

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<remoteStorage>\n");
        tag(&mut xml, "enabled", &(self.enabled as u8));
        tag(&mut xml, "protocol", &self.protocol);
        tag(&mut xml, "protocolVersion", &self.protocol_version);
        tag(&mut xml, "authentication", &self.authentication);
        tag(&mut xml, "ip", &self.ip);
        tag(&mut xml, "port", &self.port);
        tag(&mut xml, "root", &self.root);
        tag(&mut xml, "domain", &self.domain);
        if let Some(ref creds) = self.credentials {
            tag(&mut xml, "login", &creds.login);
            tag(&mut xml, "password", &creds.password);
        }
        xml.push_str("</remoteStorage>");
        xml
    }

    /// Derive the expected-values oracle for the backend artifact checks.
    pub fn expected(&self) -> ExpectedConfig {
        ExpectedConfig {
            enabled: (self.enabled as u8).to_string(),
            protocol: self.protocol.clone(),
            protocol_version: self.protocol_version.to_string(),
            authentication: self.authentication.to_string(),
            ip: self.ip.clone(),
            port: self.port.to_string(),
            root: self.root.clone(),
            domain: self.domain.clone(),
            login: self.credentials.as_ref().map(|c| c.login.clone()),
            password: self.credentials.as_ref().map(|c| c.password.clone()),
        }
    }

    /// One-line description of the combination under test.
    pub fn combination_label(&self) -> String {
        format!(
            "vers={} sec={} port={} auth={}",
            self.protocol_version,
            self.authentication,
            self.port,
            if self.authenticated() { "yes" } else { "no" }
        )
    }
}

/// Expected field values, as strings, for comparison against the three
/// backend artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedConfig {
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

/// The (version, authentication, port) combinations under test.
pub fn combination_matrix() -> [(ProtocolVersion, AuthMode, u16); 5] {
    [
        (ProtocolVersion::V1_0, AuthMode::Ntlm, 445),
        (ProtocolVersion::V1_0, AuthMode::NtlmV2, 446),
        (ProtocolVersion::V2_0, AuthMode::NtlmV2, 447),
        (ProtocolVersion::V2_1, AuthMode::NtlmV2, 448),
        (ProtocolVersion::V3_0, AuthMode::NtlmV2, 449),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_authenticated_document() {
        let config = SambaConfig::for_share("192.168.4.156").with_combination(
            ProtocolVersion::V2_1,
            AuthMode::NtlmV2,
            448,
        );
        let xml = config.render_xml();
        assert!(xml.contains("<enabled>1</enabled>"));
        assert!(xml.contains("<protocolVersion>2.1</protocolVersion>"));
        assert!(xml.contains("<authentication>ntlmv2</authentication>"));
        assert!(xml.contains("<port>448</port>"));
        assert!(xml.contains("<login>qauser</login>"));
        assert!(xml.contains("<password>qa</password>"));
    }

    #[test]
    fn render_anonymous_document_has_no_credential_tags() {
        let xml = SambaConfig::for_share("192.168.4.156").anonymous().render_xml();
        assert!(!xml.contains("<login>"));
        assert!(!xml.contains("<password>"));
        assert!(xml.contains("<domain>WORKGROUP</domain>"));
    }

    #[test]
    fn expected_oracle_matches_document() {
        let config = SambaConfig::for_share("10.1.2.3").with_combination(
            ProtocolVersion::V1_0,
            AuthMode::Ntlm,
            445,
        );
        let expected = config.expected();
        assert_eq!(expected.protocol_version, "1.0");
        assert_eq!(expected.authentication, "ntlm");
        assert_eq!(expected.port, "445");
        assert_eq!(expected.login.as_deref(), Some("qauser"));

        let anon = config.anonymous().expected();
        assert_eq!(anon.login, None);
        assert_eq!(anon.password, None);
    }

    #[test]
    fn matrix_covers_all_dialects() {
        let matrix = combination_matrix();
        assert_eq!(matrix.len(), 5);
        // Ports are distinct so parametrized runs cannot collide
        let mut ports: Vec<u16> = matrix.iter().map(|(_, _, p)| *p).collect();
        ports.dedup();
        assert_eq!(ports.len(), 5);
    }
}
