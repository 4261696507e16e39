//! Local port descriptor.
//!
//! # Responsibilities
//! - Validate protocol, address family and address consistency
//! - Render the canonical `"desc" (host:port/protoN)` form used in logs
//! - Resolve the descriptor into a concrete bind address
//!
//! # Design Decisions
//! - Construction is pure: no sockets, no DNS
//! - Fields are private, so a descriptor cannot change after validation
//! - The caller's address text is kept verbatim for rendering

use std::fmt::{self, Write as _};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use crate::net::error::PortError;

/// IP family a port is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Parse a family tag. The empty tag means "any family".
    pub fn parse_tag(tag: &str) -> Result<Option<Self>, PortError> {
        match tag {
            "" => Ok(None),
            "4" => Ok(Some(IpFamily::V4)),
            "6" => Ok(Some(IpFamily::V6)),
            other => Err(PortError::InvalidAddressFamily(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IpFamily::V4 => "4",
            IpFamily::V6 => "6",
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport protocol of a local port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        }
    }
}

impl FromStr for Protocol {
    type Err = PortError;

    /// Case-sensitive: only the lower-case names are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            other => Err(PortError::UnsupportedProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An IP address and port pair along with a protocol and, optionally, a
/// specific IP family.
///
/// A `LocalPort` can be opened through a [`PortOpener`] and the resulting
/// handle closed later.
///
/// [`PortOpener`]: crate::net::PortOpener
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalPort {
    /// Arbitrary label, used for diagnostics only.
    description: String,
    /// Address as given by the caller. Empty binds to all local addresses.
    ip: String,
    /// Parsed form of `ip`.
    addr: Option<IpAddr>,
    /// When set, the port binds only to addresses of this family.
    ip_family: Option<IpFamily>,
    /// Port number; 0 lets the OS choose.
    port: u16,
    protocol: Protocol,
}

impl LocalPort {
    /// Build a descriptor, checking that the protocol is supported and that
    /// the address agrees with the requested family.
    pub fn new(
        description: impl Into<String>,
        ip: &str,
        ip_family: &str,
        port: u16,
        protocol: &str,
    ) -> Result<Self, PortError> {
        let protocol: Protocol = protocol.parse()?;
        let ip_family = IpFamily::parse_tag(ip_family)?;

        let addr = if ip.is_empty() {
            None
        } else {
            let parsed: IpAddr = ip
                .parse()
                .map_err(|_| PortError::InvalidAddress(ip.to_string()))?;

            let is_v4 = match parsed {
                IpAddr::V4(_) => true,
                IpAddr::V6(v6) => v6.to_ipv4_mapped().is_some(),
            };
            match (is_v4, ip_family) {
                (false, Some(IpFamily::V4)) | (true, Some(IpFamily::V6)) => {
                    return Err(PortError::AddressFamilyMismatch {
                        ip: ip.to_string(),
                        family: ip_family.map(|f| f.to_string()).unwrap_or_default(),
                    });
                }
                _ => {}
            }
            Some(parsed)
        };

        Ok(Self {
            description: description.into(),
            ip: ip.to_string(),
            addr,
            ip_family,
            port,
            protocol,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Address text as supplied; empty means all local addresses.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn addr(&self) -> Option<IpAddr> {
        self.addr
    }

    pub fn ip_family(&self) -> Option<IpFamily> {
        self.ip_family
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Protocol name with the family suffix, e.g. `tcp`, `tcp4`, `udp6`.
    pub fn network(&self) -> String {
        match self.ip_family {
            Some(family) => format!("{}{}", self.protocol, family),
            None => self.protocol.to_string(),
        }
    }

    /// `host:port` joined the standard way: IPv6 hosts are bracketed and an
    /// empty host yields `:port`.
    pub fn host_port(&self) -> String {
        if self.ip.contains(':') {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }

    /// Concrete address to bind.
    ///
    /// Without an explicit address this is the IPv4 wildcard for family 4
    /// and the IPv6 wildcard otherwise. IPv4-mapped IPv6 addresses bind as
    /// plain IPv4.
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = match (self.addr, self.ip_family) {
            (Some(addr), _) => addr.to_canonical(),
            (None, Some(IpFamily::V4)) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            (None, _) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        SocketAddr::new(ip, self.port)
    }

    /// Whether holding `self` open makes the OS refuse to bind `other`.
    ///
    /// Only tcp/udp ports with the same protocol and a fixed non-zero port
    /// can collide. A wildcard overlaps every address of its family; the
    /// dual-stack wildcard (no family) overlaps both families.
    pub fn conflicts_with(&self, other: &LocalPort) -> bool {
        if self.protocol != other.protocol
            || self.protocol == Protocol::Sctp
            || self.port == 0
            || self.port != other.port
        {
            return false;
        }
        self.bind_scope().overlaps(other.bind_scope())
    }

    fn bind_scope(&self) -> BindScope {
        match (self.addr, self.ip_family) {
            (Some(addr), _) => BindScope::Addr(addr.to_canonical()),
            (None, Some(IpFamily::V4)) => BindScope::AnyV4,
            (None, Some(IpFamily::V6)) => BindScope::AnyV6,
            (None, None) => BindScope::AnyDualStack,
        }
    }
}

/// Set of local addresses a bound socket claims.
#[derive(Debug, Clone, Copy)]
enum BindScope {
    Addr(IpAddr),
    AnyV4,
    AnyV6,
    AnyDualStack,
}

impl BindScope {
    fn covers_v4(&self) -> bool {
        matches!(self, BindScope::AnyV4 | BindScope::AnyDualStack)
    }

    fn covers_v6(&self) -> bool {
        matches!(self, BindScope::AnyV6 | BindScope::AnyDualStack)
    }

    fn overlaps(self, other: BindScope) -> bool {
        match (self, other) {
            (BindScope::Addr(a), BindScope::Addr(b)) => a == b,
            (BindScope::Addr(addr), any) | (any, BindScope::Addr(addr)) => match addr {
                IpAddr::V4(_) => any.covers_v4(),
                IpAddr::V6(_) => any.covers_v6(),
            },
            (a, b) => (a.covers_v4() && b.covers_v4()) || (a.covers_v6() && b.covers_v6()),
        }
    }
}

impl fmt::Display for LocalPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(f, &self.description)?;
        write!(f, " ({}/{})", self.host_port(), self.network())
    }
}

/// Double-quote `s`, escaping quotes, backslashes and control characters
/// (`\n`, `\x7f`, `\u0085`). Other non-printable code points are written
/// as-is.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\u{7}' => f.write_str("\\a")?,
            '\u{8}' => f.write_str("\\b")?,
            '\u{c}' => f.write_str("\\f")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\u{b}' => f.write_str("\\v")?,
            c if c.is_ascii_control() => write!(f, "\\x{:02x}", c as u32)?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
