//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! net/opener.rs, config/loader.rs
//!     → tracing events (port, network, bind address)
//!     → logging.rs (EnvFilter + fmt layer)
//!     → stdout
//! ```

pub mod logging;

pub use logging::init_logging;
