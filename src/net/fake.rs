//! In-memory [`PortOpener`] for tests.
//!
//! Binds nothing. It records what was opened and applies the same conflict
//! rule the OS would, so allocation logic built on top of [`PortOpener`] can
//! be exercised without real sockets.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::net::error::PortError;
use crate::net::local_port::{LocalPort, Protocol};
use crate::net::opener::{Closeable, PortOpener};

#[derive(Debug, Default)]
struct FakeState {
    opened: Vec<LocalPort>,
    /// Ports behind live handles, keyed by handle id.
    held: Vec<(u64, LocalPort)>,
    next_id: u64,
    fail_next: Option<io::ErrorKind>,
}

/// A port opener that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct FakePortOpener {
    state: Arc<Mutex<FakeState>>,
}

impl FakePortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every descriptor passed to `open_local_port`, in call order,
    /// including the ones that failed.
    pub fn opened(&self) -> Vec<LocalPort> {
        self.lock().opened.clone()
    }

    /// Number of handles returned and not yet closed.
    pub fn held_count(&self) -> usize {
        self.lock().held.len()
    }

    /// Make the next open fail with an OS error of the given kind.
    pub fn fail_next(&self, kind: io::ErrorKind) {
        self.lock().fail_next = Some(kind);
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PortOpener for FakePortOpener {
    fn open_local_port(&self, lp: &LocalPort) -> Result<Option<Box<dyn Closeable>>, PortError> {
        let mut state = self.lock();
        state.opened.push(lp.clone());

        if let Some(kind) = state.fail_next.take() {
            return Err(PortError::Bind {
                port: lp.to_string(),
                source: io::Error::from(kind),
            });
        }

        if lp.protocol() == Protocol::Sctp {
            return Ok(None);
        }

        if state.held.iter().any(|(_, held)| held.conflicts_with(lp)) {
            return Err(PortError::Bind {
                port: lp.to_string(),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            });
        }

        // Port 0 is always satisfiable; the OS would pick a fresh port.
        let id = if lp.port() != 0 {
            state.next_id += 1;
            let id = state.next_id;
            state.held.push((id, lp.clone()));
            Some(id)
        } else {
            None
        };

        Ok(Some(Box::new(FakeHandle {
            id,
            state: Arc::clone(&self.state),
        })))
    }
}

/// Handle returned by [`FakePortOpener`].
#[derive(Debug)]
pub struct FakeHandle {
    id: Option<u64>,
    state: Arc<Mutex<FakeState>>,
}

impl Closeable for FakeHandle {
    fn close(self: Box<Self>) -> Result<(), PortError> {
        // Release happens in Drop.
        Ok(())
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.held.retain(|(held, _)| *held != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp(port: u16) -> LocalPort {
        LocalPort::new("fake", "127.0.0.1", "", port, "tcp").unwrap()
    }

    #[test]
    fn records_opened_ports() {
        let opener = FakePortOpener::new();
        let _a = opener.open_local_port(&tcp(80)).unwrap();
        let _b = opener.open_local_port(&tcp(81)).unwrap();

        let opened = opener.opened();
        assert_eq!(opened.len(), 2);
        assert_eq!(opened[0].port(), 80);
        assert_eq!(opened[1].port(), 81);
        assert_eq!(opener.held_count(), 2);
    }

    #[test]
    fn conflicting_open_fails_until_closed() {
        let opener = FakePortOpener::new();
        let first = opener.open_local_port(&tcp(8080)).unwrap().unwrap();

        let err = opener.open_local_port(&tcp(8080)).unwrap_err();
        assert_eq!(err.io_error().unwrap().kind(), io::ErrorKind::AddrInUse);

        first.close().unwrap();
        assert_eq!(opener.held_count(), 0);
        assert!(opener.open_local_port(&tcp(8080)).unwrap().is_some());
    }

    #[test]
    fn different_protocol_does_not_conflict() {
        let opener = FakePortOpener::new();
        let udp = LocalPort::new("fake", "127.0.0.1", "", 53, "udp").unwrap();
        let _t = opener.open_local_port(&tcp(53)).unwrap();
        assert!(opener.open_local_port(&udp).unwrap().is_some());
    }

    #[test]
    fn specific_address_after_wildcard_is_in_use() {
        let opener = FakePortOpener::new();
        let any4 = LocalPort::new("fake", "", "4", 8080, "tcp").unwrap();
        let wildcard = opener.open_local_port(&any4).unwrap();

        let err = opener.open_local_port(&tcp(8080)).unwrap_err();
        assert_eq!(err.io_error().unwrap().kind(), io::ErrorKind::AddrInUse);

        // An IPv6 address is outside the IPv4 wildcard.
        let lo6 = LocalPort::new("fake", "::1", "", 8080, "tcp").unwrap();
        assert!(opener.open_local_port(&lo6).unwrap().is_some());

        drop(wildcard);
        assert!(opener.open_local_port(&tcp(8080)).unwrap().is_some());
    }

    #[test]
    fn dual_stack_wildcard_blocks_both_families() {
        let opener = FakePortOpener::new();
        let dual = LocalPort::new("fake", "", "", 8080, "udp").unwrap();
        let _held = opener.open_local_port(&dual).unwrap();

        for (ip, family) in [("127.0.0.1", ""), ("::1", "6"), ("", "4"), ("", "6")] {
            let lp = LocalPort::new("fake", ip, family, 8080, "udp").unwrap();
            assert!(opener.open_local_port(&lp).is_err(), "{lp} should be in use");
        }
    }

    #[test]
    fn family_tag_does_not_change_the_address() {
        let opener = FakePortOpener::new();
        let tagged = LocalPort::new("fake", "127.0.0.1", "4", 8080, "tcp").unwrap();
        let _held = opener.open_local_port(&tagged).unwrap();

        let err = opener.open_local_port(&tcp(8080)).unwrap_err();
        assert_eq!(err.io_error().unwrap().kind(), io::ErrorKind::AddrInUse);
    }

    #[test]
    fn port_zero_never_conflicts() {
        let opener = FakePortOpener::new();
        let _a = opener.open_local_port(&tcp(0)).unwrap();
        let _b = opener.open_local_port(&tcp(0)).unwrap();
        assert_eq!(opener.held_count(), 0);
    }

    #[test]
    fn sctp_has_no_handle() {
        let opener = FakePortOpener::new();
        let lp = LocalPort::new("fake", "", "", 9, "sctp").unwrap();
        assert!(opener.open_local_port(&lp).unwrap().is_none());
        assert!(opener.open_local_port(&lp).unwrap().is_none());
    }

    #[test]
    fn dropping_handle_releases() {
        let opener = FakePortOpener::new();
        let handle = opener.open_local_port(&tcp(9000)).unwrap();
        drop(handle);
        assert_eq!(opener.held_count(), 0);
    }

    #[test]
    fn fail_next_applies_once() {
        let opener = FakePortOpener::new();
        opener.fail_next(io::ErrorKind::PermissionDenied);

        let err = opener.open_local_port(&tcp(22)).unwrap_err();
        assert_eq!(err.io_error().unwrap().kind(), io::ErrorKind::PermissionDenied);
        assert!(opener.open_local_port(&tcp(22)).unwrap().is_some());
        assert_eq!(opener.opened().len(), 2);
    }
}
