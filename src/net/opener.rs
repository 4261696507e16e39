//! Opening and holding local ports.
//!
//! # Responsibilities
//! - Turn a validated [`LocalPort`] into a bound OS socket
//! - Dispatch on protocol: listen for TCP, bind for UDP, skip SCTP
//! - Hand back a handle whose `close` frees the port
//!
//! # Design Decisions
//! - `PortOpener` is a trait so callers can swap in [`FakePortOpener`]
//! - Each open is one blocking bind; no retries, no shared state
//! - OS errors are returned untouched inside [`PortError::Bind`]
//!
//! [`FakePortOpener`]: crate::net::FakePortOpener

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol as SockProtocol, Socket, Type};

use crate::net::error::{PortError, PortResult};
use crate::net::local_port::{IpFamily, LocalPort, Protocol};

/// Backlog passed to `listen(2)` for TCP ports.
const LISTEN_BACKLOG: i32 = 128;

/// An opened local port that can be released.
///
/// `close` consumes the handle, so a port is released at most once.
/// Dropping a handle without closing it also frees the port.
///
/// Neither built-in handle ever returns `Err`: the socket is released by
/// dropping it, which discards any error from `close(2)`.
pub trait Closeable: fmt::Debug + Send {
    fn close(self: Box<Self>) -> Result<(), PortError>;
}

/// Opens a [`LocalPort`] and allows later closing it.
///
/// Returns `Ok(None)` when the protocol is reserved without an OS resource
/// (SCTP).
pub trait PortOpener: Send + Sync {
    fn open_local_port(&self, lp: &LocalPort) -> Result<Option<Box<dyn Closeable>>, PortError>;
}

/// Opens ports by calling `bind()` and, for TCP, `listen()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenPortOpener;

impl ListenPortOpener {
    pub fn new() -> Self {
        Self
    }

    /// Hold the given local port open, returning the concrete handle.
    pub fn open(&self, lp: &LocalPort) -> PortResult<Option<HeldPort>> {
        // Exhaustive: an unknown protocol is rejected by LocalPort::new.
        let kind = match lp.protocol() {
            Protocol::Tcp => SocketKind::TCP,
            Protocol::Udp => SocketKind::UDP,
            Protocol::Sctp => {
                // SCTP ports are intentionally ignored so the sctp kernel
                // module is never autoloaded; it breaks userspace SCTP.
                tracing::debug!(port = %lp, "Skipping OS bind for SCTP port");
                return Ok(None);
            }
        };

        let addr = lp.bind_addr();
        tracing::debug!(
            port = %lp,
            network = %lp.network(),
            bind_address = %addr,
            "Opening local port"
        );

        let socket = bind_local_port(lp, kind, addr).map_err(|source| {
            tracing::warn!(port = %lp, error = %source, "Failed to open local port");
            PortError::Bind {
                port: lp.to_string(),
                source,
            }
        })?;

        let local_addr = socket
            .local_addr()
            .ok()
            .and_then(|a| a.as_socket())
            .unwrap_or(addr);

        tracing::info!(port = %lp, local_address = %local_addr, "Local port held open");

        Ok(Some(HeldPort {
            port: lp.to_string(),
            local_addr,
            socket,
        }))
    }
}

impl PortOpener for ListenPortOpener {
    fn open_local_port(&self, lp: &LocalPort) -> Result<Option<Box<dyn Closeable>>, PortError> {
        Ok(self
            .open(lp)?
            .map(|held| Box::new(held) as Box<dyn Closeable>))
    }
}

/// A bound TCP listener or UDP socket.
#[derive(Debug)]
pub struct HeldPort {
    /// Rendered descriptor, kept for logging on release.
    port: String,
    local_addr: SocketAddr,
    socket: Socket,
}

impl HeldPort {
    /// Address the socket is actually bound to, including the OS-chosen
    /// port when the descriptor asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Closeable for HeldPort {
    fn close(self: Box<Self>) -> Result<(), PortError> {
        let HeldPort {
            port,
            local_addr,
            socket,
        } = *self;
        drop(socket);
        tracing::debug!(port = %port, local_address = %local_addr, "Local port released");
        Ok(())
    }
}

/// Socket type and protocol for one of the bindable protocols.
#[derive(Debug, Clone, Copy)]
struct SocketKind {
    ty: Type,
    protocol: SockProtocol,
    listen: bool,
}

impl SocketKind {
    const TCP: SocketKind = SocketKind {
        ty: Type::STREAM,
        protocol: SockProtocol::TCP,
        listen: true,
    };

    const UDP: SocketKind = SocketKind {
        ty: Type::DGRAM,
        protocol: SockProtocol::UDP,
        listen: false,
    };

    fn socket(&self, addr: SocketAddr) -> io::Result<Socket> {
        Socket::new(Domain::for_address(addr), self.ty, Some(self.protocol))
    }

    fn bind(&self, socket: Socket, addr: SocketAddr, v6_only: bool) -> io::Result<Socket> {
        if addr.is_ipv6() {
            socket.set_only_v6(v6_only)?;
        }
        if self.listen {
            set_reuse_address(&socket)?;
        }
        socket.bind(&addr.into())?;
        if self.listen {
            socket.listen(LISTEN_BACKLOG)?;
        }
        Ok(socket)
    }
}

/// Bind `addr` for `lp`.
///
/// A wildcard port with no family binds dual-stack on `::`; on hosts
/// without usable IPv6 it falls back to `0.0.0.0`.
fn bind_local_port(lp: &LocalPort, kind: SocketKind, addr: SocketAddr) -> io::Result<Socket> {
    let v6_only = lp.ip_family() == Some(IpFamily::V6);
    let dual_stack = lp.addr().is_none() && lp.ip_family().is_none();

    if !dual_stack {
        return kind.bind(kind.socket(addr)?, addr, v6_only);
    }

    let fallback = |e: io::Error| -> io::Result<Socket> {
        let fallback = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), addr.port());
        tracing::debug!(
            port = %lp,
            error = %e,
            bind_address = %fallback,
            "IPv6 unavailable, binding IPv4 wildcard"
        );
        kind.bind(kind.socket(fallback)?, fallback, false)
    };

    let socket = match kind.socket(addr) {
        Ok(socket) => socket,
        Err(e) => return fallback(e),
    };
    match kind.bind(socket, addr, false) {
        Err(e) if matches!(e.kind(), io::ErrorKind::AddrNotAvailable | io::ErrorKind::Unsupported) => {
            fallback(e)
        }
        other => other,
    }
}

#[cfg(unix)]
fn set_reuse_address(socket: &Socket) -> io::Result<()> {
    socket.set_reuse_address(true)
}

#[cfg(not(unix))]
fn set_reuse_address(_socket: &Socket) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sctp_is_never_bound() {
        let opener = ListenPortOpener::new();
        // Port 1 would need privileges if it were really bound.
        let lp = LocalPort::new("sctp", "192.0.2.1", "", 1, "sctp").unwrap();
        assert!(opener.open(&lp).unwrap().is_none());
        assert!(opener.open_local_port(&lp).unwrap().is_none());
    }

    #[test]
    fn tcp_ephemeral_port_reports_local_addr() {
        let opener = ListenPortOpener::new();
        let lp = LocalPort::new("tcp", "127.0.0.1", "4", 0, "tcp").unwrap();
        let held = opener.open(&lp).unwrap().unwrap();
        assert_eq!(held.local_addr().ip(), Ipv4Addr::LOCALHOST);
        assert_ne!(held.local_addr().port(), 0);
        Box::new(held).close().unwrap();
    }

    #[test]
    fn bind_error_keeps_os_error() {
        let opener = ListenPortOpener::new();
        // TEST-NET-1 is never assigned locally.
        let lp = LocalPort::new("unassigned", "192.0.2.1", "", 0, "udp").unwrap();
        let err = opener.open(&lp).unwrap_err();
        let io = err.io_error().expect("bind error");
        assert_eq!(io.kind(), io::ErrorKind::AddrNotAvailable);
        assert!(err.to_string().contains("192.0.2.1:0/udp"));
    }
}
