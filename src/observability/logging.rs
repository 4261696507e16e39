//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Pick the log level from the environment or the config
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level
//! - Initialization is idempotent so tests and embedders can both call it

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Default filter directive for this crate at the configured level.
pub fn default_directive(config: &ObservabilityConfig) -> String {
    format!("local_port={}", config.log_level)
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(config).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_uses_configured_level() {
        let config = ObservabilityConfig {
            log_level: "debug".into(),
        };
        assert_eq!(default_directive(&config), "local_port=debug");
    }

    #[test]
    fn second_init_is_noop() {
        let config = ObservabilityConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
