//! Flowcheck Core Library
//!
//! This library provides the verification logic for the appliance checks:
//! - Exit codes for CLI operations
//! - Structured logging setup
//! - Collector daemon IO priority verification
//! - Samba remote-storage configuration verification and round-trip
//!
//! The binary entry point is in `main.rs`.

pub mod exit_codes;
pub mod ioprio;
pub mod logging;
pub mod samba;
