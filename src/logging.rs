//! Tracing subscriber setup for hosts that do not install their own.

use tracing_subscriber::EnvFilter;

use crate::config::LOG_VAR;

const DEFAULT_FILTER: &str = "warn";

/// Pick the filter directive: explicit, then `ANALYTICS_BINDINGS_LOG`, then
/// `RUST_LOG`, then `warn`.
pub fn filter_directive(explicit: Option<&str>) -> String {
    if let Some(filter) = explicit.map(str::trim).filter(|f| !f.is_empty()) {
        return filter.to_string();
    }
    for var in [LOG_VAR, "RUST_LOG"] {
        if let Ok(val) = dotenvy::var(var)
            && !val.trim().is_empty()
        {
            return val;
        }
    }
    DEFAULT_FILTER.to_string()
}

/// Install a global fmt subscriber. Returns `false` when one was already set.
pub fn init(explicit: Option<&str>) -> bool {
    let directive = filter_directive(explicit);
    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
