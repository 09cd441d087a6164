//! Logging initialization and configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "chat_relay=info";

/// Build a filter from a configured level.
///
/// A bare level such as `debug` applies to this crate only; anything that
/// already looks like a directive (`chat_relay=trace,tower_http=debug`) is
/// used as given. Unparseable input falls back to `chat_relay=info`.
pub fn build_filter(level: &str) -> EnvFilter {
    let level = level.trim();
    let directive = if level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("chat_relay={level}")
    };

    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Pick the subscriber filter.
///
/// A non-empty, valid `RUST_LOG` directive wins as given; otherwise the
/// configured level is applied through [`build_filter`].
pub fn resolve_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| build_filter(level))
}

fn env_filter(level: &str) -> EnvFilter {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    resolve_filter(rust_log.as_deref(), level)
}

/// Initialize the logging system.
///
/// Uses `RUST_LOG` when set, otherwise the configured `level`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init(level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}
