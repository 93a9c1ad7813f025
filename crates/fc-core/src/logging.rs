//! Structured logging setup for fc-core.
//!
//! stdout is reserved for check reports (JSON/text output); all log
//! output goes to stderr. The filter comes from `FC_LOG` when set,
//! otherwise from the CLI verbosity flags.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "FC_LOG";

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
