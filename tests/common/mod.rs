//! Shared helpers for integration tests.

use local_port::net::HeldPort;
use local_port::{ListenPortOpener, LocalPort};

/// Build a loopback IPv4 descriptor.
#[allow(dead_code)]
pub fn loopback(protocol: &str, port: u16) -> LocalPort {
    LocalPort::new(format!("loopback {protocol}"), "127.0.0.1", "4", port, protocol).unwrap()
}

/// Build a loopback IPv6 descriptor restricted to family 6.
#[allow(dead_code)]
pub fn loopback_v6(protocol: &str, port: u16) -> LocalPort {
    LocalPort::new(format!("loopback6 {protocol}"), "::1", "6", port, protocol).unwrap()
}

/// Open an OS-chosen port for `lp` (which must ask for port 0) and return
/// the held socket plus a descriptor for the same address with that port.
pub fn hold_ephemeral_as(lp: &LocalPort) -> (HeldPort, LocalPort) {
    let held = ListenPortOpener::new()
        .open(lp)
        .unwrap()
        .expect("tcp/udp always yield a handle");
    let port = held.local_addr().port();
    let fixed = LocalPort::new(
        lp.description(),
        lp.ip(),
        lp.ip_family().map(|f| f.as_str()).unwrap_or(""),
        port,
        lp.protocol().as_str(),
    )
    .unwrap();
    (held, fixed)
}

/// Open an OS-chosen IPv4 loopback port.
#[allow(dead_code)]
pub fn hold_ephemeral(protocol: &str) -> (HeldPort, LocalPort) {
    hold_ephemeral_as(&loopback(protocol, 0))
}

/// Whether this host can bind IPv6 loopback at all.
#[allow(dead_code)]
pub fn ipv6_available() -> bool {
    std::net::TcpListener::bind("[::1]:0").is_ok()
}
