//! Structured logging initialization via `tracing`.
//!
//! The node configuration owns the log level and output format; an
//! explicit `RUST_LOG` in the environment still wins so operators can
//! override a running deployment without touching its config file.

use tracing_subscriber::EnvFilter;

fn resolve_filter(configured_level: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(configured_level.unwrap_or("info"))
    }
}

/// Install the global subscriber.
///
/// `configured_level` comes from the node config's `log_level`; `json`
/// switches to newline-delimited JSON events for log shippers.
pub fn init_tracing(configured_level: Option<&str>, json: bool) {
    let filter = resolve_filter(configured_level);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
