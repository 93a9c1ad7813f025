//! Flowcheck common types, IDs, and errors.
//!
//! This crate provides foundational types shared across fc crates:
//! - Process identity types
//! - Common error taxonomy with category classification
//! - Output format specifications
//! - On-device path and service constants

pub mod error;
pub mod id;
pub mod output;
pub mod paths;

pub use error::{Error, ErrorCategory, Result};
pub use id::ProcessId;
pub use output::OutputFormat;
