//! Logging setup
//!
//! Installs a `tracing-subscriber` formatter on stderr. `RUST_LOG`, when set,
//! takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Noisy dependencies kept at `warn` regardless of the base level
const QUIET_TARGETS: &[(&str, &str)] = &[("rustyline", "warn")];

/// Build the filter from `RUST_LOG` or, failing that, the configured level
fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level.to_string()];
    for (target, lvl) in QUIET_TARGETS {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| Error::Config(format!("invalid log filter '{}': {}", filter_str, e)))
}

/// Initialize logging to stderr.
///
/// Calling this twice is harmless; the first subscriber stays installed.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = build_env_filter(level)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level, "Logging initialized");
    }
    Ok(())
}
