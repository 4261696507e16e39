//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::PortsConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::net::LocalPort;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// A parsed configuration together with its validated ports.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PortsConfig,
    pub ports: Vec<LocalPort>,
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<LoadedConfig, ConfigError> {
    let config: PortsConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    let ports = validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(ports = ports.len(), "Configuration loaded");

    Ok(LoadedConfig { config, ports })
}
