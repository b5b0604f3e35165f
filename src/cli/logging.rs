//! Logging setup for the CLI
//!
//! Logs go to stderr so stdout stays clean for `client-finish` output.
//! `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else `level`
pub fn filter(level: &str) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| format!("Invalid log level '{}': {}", level, e).into())
}

/// Install the global subscriber
///
/// Returns `false` when another subscriber was already installed (e.g. by a
/// test harness); that one is kept.
pub fn init(level: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let filter = filter(level)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    match installed {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::debug!(error = %e, "global subscriber already installed, keeping it");
            Ok(false)
        }
    }
}
