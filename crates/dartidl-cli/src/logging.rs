//! Diagnostic logging for the CLI.
//!
//! Library code logs through `tracing`; nothing is printed unless
//! `DARTIDL_LOG` (or `RUST_LOG`) holds a filter such as `dartidl_compiler=debug`.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "DARTIDL_LOG";

fn filter_from_env() -> Option<EnvFilter> {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .ok()
}

/// Installs a stderr subscriber when a filter is configured.
pub fn init() {
    let Some(filter) = filter_from_env() else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
