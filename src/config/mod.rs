//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (build every LocalPort, semantic checks)
//!     → Vec<LocalPort> ready for a PortOpener
//! ```
//!
//! # Design Decisions
//! - Entries stay textual in the schema; LocalPort::new is the only validator
//! - All validation errors are reported, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, LoadedConfig};
pub use schema::{ObservabilityConfig, PortConfig, PortsConfig};
pub use validation::{validate_config, ValidationError};
