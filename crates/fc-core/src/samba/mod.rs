//! Samba remote-storage configuration verification.
//!
//! This module covers the second appliance feature under test:
//! - `config`: the in-memory configuration model and its import document
//! - `oracle`: parsers for the three on-device backend artifacts
//! - `verify`: comparison of the artifacts against the configuration
//! - `roundtrip`: the end-to-end share round-trip driver
//!
//! The three artifacts are produced by unrelated appliance subsystems
//! with incompatible serialization conventions, so each keeps its own
//! parser instead of sharing a unified one.

pub mod config;
pub mod oracle;
pub mod roundtrip;
pub mod verify;

pub use config::{
    combination_matrix, AuthMode, Credentials, ExpectedConfig, ProtocolVersion, SambaConfig,
};
pub use oracle::{CredentialsFile, MountOptions, OracleError, StorageCfg};
pub use roundtrip::{
    run_matrix, run_round_trip, CombinationResult, MatrixOutcome, RoundTripError, RoundTripReport,
};
pub use verify::{verify_backend, VerifyError};
