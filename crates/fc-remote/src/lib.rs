//! Flowcheck remote execution layer.
//!
//! This crate provides everything that talks to the appliance:
//! - The `Runner` trait for synchronous remote command execution
//! - An SSH-backed runner driving the `ssh` binary
//! - Remote file probes (size, existence, read, write, remove)
//! - The remote-storage service client and `remote_storage` CLI wrappers
//!
//! The binary entry point and the checks themselves live in `fc-core`.

pub mod exec;
pub mod files;
pub mod ssh;
pub mod storage;

// Re-export the mock appliance for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use exec::{ExecError, ExecOutput, Runner};
pub use ssh::{SshConfig, SshRunner};
pub use storage::{RemoteStorage, StorageError};
