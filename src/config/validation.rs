//! Configuration validation.
//!
//! # Responsibilities
//! - Build a `LocalPort` from every entry
//! - Detect entries whose binds overlap (same address, or a wildcard
//!   covering it)
//! - Check the log level
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: PortsConfig → Result<Vec<LocalPort>, Vec<ValidationError>>

use crate::config::schema::PortsConfig;
use crate::net::LocalPort;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Entry rejected by `LocalPort::new`.
    InvalidPort {
        index: usize,
        description: String,
        reason: String,
    },
    /// Entry overlaps an earlier entry's bind, so opening both in order
    /// would fail with "address in use".
    DuplicatePort { index: usize, first: usize, port: String },
    /// Unknown log level.
    InvalidLogLevel(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidPort {
                index,
                description,
                reason,
            } => write!(f, "ports[{}] {:?}: {}", index, description, reason),
            ValidationError::DuplicatePort { index, first, port } => {
                write!(f, "ports[{}] {} conflicts with ports[{}]", index, port, first)
            }
            ValidationError::InvalidLogLevel(level) => {
                write!(f, "invalid log level {:?}", level)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate the configuration and return the descriptors in file order.
pub fn validate_config(config: &PortsConfig) -> Result<Vec<LocalPort>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut ports = Vec::with_capacity(config.ports.len());
    let mut bound: Vec<(usize, LocalPort)> = Vec::new();

    for (index, entry) in config.ports.iter().enumerate() {
        let lp = match LocalPort::new(
            entry.description.clone(),
            &entry.address,
            &entry.family,
            entry.port,
            &entry.protocol,
        ) {
            Ok(lp) => lp,
            Err(e) => {
                errors.push(ValidationError::InvalidPort {
                    index,
                    description: entry.description.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        // SCTP and port 0 never conflict; see LocalPort::conflicts_with.
        let conflict = bound
            .iter()
            .find(|(_, earlier)| earlier.conflicts_with(&lp))
            .map(|(first, _)| *first);
        match conflict {
            Some(first) => errors.push(ValidationError::DuplicatePort {
                index,
                first,
                port: lp.to_string(),
            }),
            None => bound.push((index, lp.clone())),
        }

        ports.push(lp);
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(ports)
    } else {
        Err(errors)
    }
}
