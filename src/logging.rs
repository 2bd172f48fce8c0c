//! Optional tracing bootstrap
//!
//! The library only emits `tracing` events; hosts install their own
//! subscriber. This helper installs a formatted subscriber for binaries and
//! tests that have none.

use crate::error::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Default filter directive for the current build mode
///
/// - `debug` builds -> `docstore=debug`
/// - `release` builds -> `docstore=info`
pub fn default_directive() -> &'static str {
    if cfg!(debug_assertions) {
        "docstore=debug"
    } else {
        "docstore=info"
    }
}

/// Install a global fmt subscriber
///
/// `RUST_LOG` takes precedence over `directive` when set. Fails instead of
/// panicking when the directive is invalid or a subscriber already exists.
pub fn init_tracing(directive: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive).map_err(|e| Error::Configuration {
            message: format!("invalid log directive `{}`: {}", directive, e),
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| Error::Configuration {
            message: format!("failed to install tracing subscriber: {}", e),
        })
}
