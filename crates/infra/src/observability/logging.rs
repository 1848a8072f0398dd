//! Tracing initialisation
//!
//! `RUST_LOG` wins when set; otherwise the configured level is used, and an
//! unparseable level falls back to `info`.

use fieldsync_domain::constants::DEFAULT_LOG_LEVEL;
use fieldsync_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, then `level`, then the default level
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Install the global subscriber
///
/// Returns `false` if a global subscriber was already installed; the existing
/// one is left in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = build_filter(&config.level);

    let result = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init()
    };

    match result {
        Ok(()) => {
            tracing::debug!(level = %config.level, json = config.json, "Tracing initialised");
            true
        }
        Err(_) => false,
    }
}
