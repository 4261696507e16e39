//! Reservable local network ports.
//!
//! A [`LocalPort`] describes an address, port, protocol and optional IP
//! family. A [`PortOpener`] turns it into a held socket that keeps the port
//! claimed until the returned handle is closed.
//!
//! ```no_run
//! use local_port::{Closeable, ListenPortOpener, LocalPort, PortOpener};
//!
//! let lp = LocalPort::new("metrics", "127.0.0.1", "4", 9100, "tcp")?;
//! let handle = ListenPortOpener::new().open_local_port(&lp)?;
//! // ... advertise the port ...
//! if let Some(handle) = handle {
//!     handle.close()?;
//! }
//! # Ok::<(), local_port::PortError>(())
//! ```

pub mod config;
pub mod net;
pub mod observability;

pub use config::PortsConfig;
pub use net::{
    Closeable, FakePortOpener, IpFamily, ListenPortOpener, LocalPort, PortError, PortOpener,
    Protocol,
};
