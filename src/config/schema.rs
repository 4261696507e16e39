//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use serde::{Deserialize, Serialize};

/// Root configuration: the ports to hold plus logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PortsConfig {
    /// Ports to reserve, in the order they should be opened.
    pub ports: Vec<PortConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One local port entry.
///
/// Field values are kept as text; [`validate_config`] turns them into
/// validated [`LocalPort`]s.
///
/// [`validate_config`]: crate::config::validation::validate_config
/// [`LocalPort`]: crate::net::LocalPort
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortConfig {
    /// Label used in logs.
    #[serde(default)]
    pub description: String,

    /// IP literal to bind. Empty binds all local addresses.
    #[serde(default)]
    pub address: String,

    /// Address family tag: "", "4" or "6".
    #[serde(default)]
    pub family: String,

    /// Port number; 0 lets the OS choose.
    pub port: u16,

    /// "tcp", "udp" or "sctp".
    pub protocol: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
