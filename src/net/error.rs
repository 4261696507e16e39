//! Errors produced while describing or opening a local port.

use std::io;

use thiserror::Error;

/// Errors that can occur while constructing or opening a [`LocalPort`].
///
/// [`LocalPort`]: crate::net::LocalPort
#[derive(Debug, Error)]
pub enum PortError {
    /// Protocol is not one of `tcp`, `udp` or `sctp`.
    #[error("unsupported protocol {0}")]
    UnsupportedProtocol(String),

    /// Address family tag is not empty, `4` or `6`.
    #[error("invalid IP family {0}")]
    InvalidAddressFamily(String),

    /// Address is not an IP literal.
    #[error("invalid ip address {0}")]
    InvalidAddress(String),

    /// Address belongs to the other family than the one requested.
    #[error("ip address and family mismatch {ip}, {family}")]
    AddressFamilyMismatch { ip: String, family: String },

    /// The operating system refused to bind or listen.
    #[error("failed to open {port}: {source}")]
    Bind {
        port: String,
        #[source]
        source: io::Error,
    },
}

impl PortError {
    /// The underlying OS error, if this is a bind failure.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            PortError::Bind { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for port operations.
pub type PortResult<T> = Result<T, PortError>;
