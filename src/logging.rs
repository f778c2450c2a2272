//! Tracing subscriber setup for the opflow binary.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use crate::config::LoggingConfig;
use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `filter` is an `EnvFilter` directive; `verbose` raises it to debug for this crate.
pub fn init(logging: &LoggingConfig, filter: &str, verbose: bool) -> Result<()> {
    let directive = if verbose {
        format!("{},opflow=debug", filter)
    } else {
        filter.to_string()
    };
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", directive, e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
