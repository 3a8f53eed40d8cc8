//! Tracing subscriber setup for hosts embedding the runtime

use tracing_subscriber::EnvFilter;

/// Env var holding the log filter directive
pub const LOG_ENV: &str = "TESSERA_LOG";

/// Build the filter from `TESSERA_LOG`, falling back to `default_directive`
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a fmt subscriber. Returns false if one was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .try_init()
        .is_ok()
}
