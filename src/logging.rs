//! Logging setup.
//!
//! The runtime emits `tracing` events with a `component` field naming the
//! subsystem (`Registry`, `Loader`, `Router`, ...). Hosts that already install
//! a subscriber can skip [`init_logging`] entirely.

use tracing_subscriber::EnvFilter;

use crate::config::LoggerConfig;

/// Install a formatting subscriber for the configured level.
///
/// `RUST_LOG` wins over the configured level. A disabled logger installs an
/// `off` filter. Returns false when a global subscriber was already set.
pub fn init_logging(config: &LoggerConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(config))
        .with_target(false)
        .try_init()
        .is_ok()
}

fn filter_for(config: &LoggerConfig) -> EnvFilter {
    if !config.enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}
