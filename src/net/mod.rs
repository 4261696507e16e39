//! Local port reservation.
//!
//! # Data Flow
//! ```text
//! description, address, family, port, protocol
//!     → local_port.rs (validate, no I/O)
//!     → LocalPort (immutable)
//!     → opener.rs (bind/listen per protocol)
//!     → Closeable handle held by the caller
//!     → close() frees the port
//! ```
//!
//! # Design Decisions
//! - Validation and I/O are split: descriptors never touch sockets
//! - `PortOpener` is a trait; `fake.rs` provides an I/O-free double
//! - SCTP is reported open without binding anything

pub mod error;
pub mod fake;
pub mod local_port;
pub mod opener;

pub use error::{PortError, PortResult};
pub use fake::{FakeHandle, FakePortOpener};
pub use local_port::{IpFamily, LocalPort, Protocol};
pub use opener::{Closeable, HeldPort, ListenPortOpener, PortOpener};
