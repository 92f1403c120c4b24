//! IPv4 address lookup for a named network interface.
//!
//! One `SIOCGIFADDR` query per call against a transient `AF_INET` datagram
//! socket. Every failure (bad name, no socket, unknown interface, no IPv4
//! address) is reported as the single [`NotFound`] outcome; the attached
//! [`NotFoundReason`] is diagnostic only.

use std::fmt;
use std::io;
use std::net::Ipv4Addr;

/// Size of the kernel's interface-name buffer, terminator included.
pub const IFNAMSIZ: usize = 16;

/// Why an interface address could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The name was rejected before any OS call.
    InvalidName(NameDefect),
    /// The control socket could not be created.
    SocketUnavailable(io::ErrorKind),
    /// The `SIOCGIFADDR` query failed (no such interface, no address, ...).
    QueryFailed(io::ErrorKind),
    /// The interface answered with a non-IPv4 address family.
    NotIpv4 { family: u16 },
    /// Interface queries are not implemented on this platform.
    Unsupported,
}

/// Problems with an interface name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameDefect {
    Empty,
    /// Length in bytes; must be below [`IFNAMSIZ`].
    TooLong(usize),
    ContainsNul,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::InvalidName(NameDefect::Empty) => write!(f, "empty interface name"),
            NotFoundReason::InvalidName(NameDefect::TooLong(len)) => write!(
                f,
                "interface name is {len} bytes, limit is {}",
                IFNAMSIZ - 1
            ),
            NotFoundReason::InvalidName(NameDefect::ContainsNul) => {
                write!(f, "interface name contains a NUL byte")
            }
            NotFoundReason::SocketUnavailable(kind) => {
                write!(f, "control socket unavailable: {kind}")
            }
            NotFoundReason::QueryFailed(kind) => write!(f, "address query failed: {kind}"),
            NotFoundReason::NotIpv4 { family } => write!(f, "address family {family} is not IPv4"),
            NotFoundReason::Unsupported => write!(f, "not supported on this platform"),
        }
    }
}

/// The interface has no IPv4 address this process can see.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no IPv4 address for interface {interface:?}: {reason}")]
pub struct NotFound {
    pub interface: String,
    pub reason: NotFoundReason,
}

/// A validated interface name: non-empty, shorter than [`IFNAMSIZ`], no NUL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceName(String);

impl InterfaceName {
    pub fn new(name: &str) -> Result<Self, NameDefect> {
        if name.is_empty() {
            return Err(NameDefect::Empty);
        }
        if name.len() >= IFNAMSIZ {
            return Err(NameDefect::TooLong(name.len()));
        }
        if name.as_bytes().contains(&0) {
            return Err(NameDefect::ContainsNul);
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for InterfaceName {
    type Error = NameDefect;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

/// Resolve the IPv4 address configured on `name`.
///
/// Names that do not fit the kernel buffer are rejected up front, so an
/// over-long name can never be truncated into some other interface's name.
pub fn resolve(name: &str) -> Result<Ipv4Addr, NotFound> {
    let ifname = InterfaceName::new(name).map_err(|defect| NotFound {
        interface: name.to_string(),
        reason: NotFoundReason::InvalidName(defect),
    })?;
    resolve_name(&ifname)
}

/// Resolve the IPv4 address configured on an already validated name.
pub fn resolve_name(name: &InterfaceName) -> Result<Ipv4Addr, NotFound> {
    match sys::query(name) {
        Ok(addr) => {
            tracing::debug!(interface = %name, %addr, "resolved interface address");
            Ok(addr)
        }
        Err(reason) => {
            tracing::debug!(interface = %name, %reason, "interface address not found");
            Err(NotFound {
                interface: name.to_string(),
                reason,
            })
        }
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "netbsd"
))]
mod sys {
    use std::ffi::c_char;
    use std::io;
    use std::mem;
    use std::net::Ipv4Addr;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
    use std::ptr;

    use super::{IFNAMSIZ, InterfaceName, NotFoundReason};

    #[cfg(any(target_os = "linux", target_os = "android"))]
    const SIOCGIFADDR: libc::c_ulong = 0x8915;

    /// `_IOWR('i', 33, struct ifreq)` on the BSD family.
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const SIOCGIFADDR: libc::c_ulong = 0xc020_6921;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    const SOCK_TYPE: libc::c_int = libc::SOCK_DGRAM | libc::SOCK_CLOEXEC;

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const SOCK_TYPE: libc::c_int = libc::SOCK_DGRAM;

    /// `struct ifreq` with the `ifr_addr` member of its union spelled out.
    #[repr(C)]
    pub(super) struct IfReq {
        pub(super) ifr_name: [c_char; IFNAMSIZ],
        pub(super) ifr_addr: libc::sockaddr,
        // Room for the larger members of the kernel's ifr_ifru union.
        _ifr_pad: [u8; 16],
    }

    impl IfReq {
        /// A zeroed record carrying `name` and the `AF_INET` family hint.
        pub(super) fn new(name: &InterfaceName) -> Self {
            // SAFETY: every field is an integer or an array of integers, so
            // the all-zero bit pattern is a valid value.
            let mut req: IfReq = unsafe { mem::zeroed() };
            // `name` is shorter than IFNAMSIZ, so the zeroed tail terminates it.
            for (dst, src) in req.ifr_name.iter_mut().zip(name.as_str().bytes()) {
                *dst = src as c_char;
            }
            req.ifr_addr.sa_family = libc::AF_INET as libc::sa_family_t;
            req
        }

        pub(super) fn ipv4(&self) -> Result<Ipv4Addr, NotFoundReason> {
            let family = self.ifr_addr.sa_family;
            if i32::from(family) != libc::AF_INET {
                return Err(NotFoundReason::NotIpv4 {
                    family: u16::from(family),
                });
            }
            // SAFETY: the family says the kernel stored a `sockaddr_in`, which
            // is no larger than the `sockaddr` slot it was written into.
            let sin: libc::sockaddr_in =
                unsafe { ptr::read_unaligned(ptr::addr_of!(self.ifr_addr).cast()) };
            Ok(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)))
        }
    }

    fn control_socket() -> io::Result<OwnedFd> {
        // SAFETY: socket(2) takes no pointers; the result is checked below.
        let fd = unsafe { libc::socket(libc::AF_INET, SOCK_TYPE, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `fd` was just returned by socket(2) and has no other owner.
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }

    pub(super) fn query(name: &InterfaceName) -> Result<Ipv4Addr, NotFoundReason> {
        let socket =
            control_socket().map_err(|e| NotFoundReason::SocketUnavailable(e.kind()))?;
        let mut req = IfReq::new(name);

        // SAFETY: `req` is a live, correctly sized ifreq record and the
        // descriptor stays open until `socket` is dropped below.
        let rc = unsafe {
            libc::ioctl(
                socket.as_raw_fd(),
                SIOCGIFADDR as _,
                ptr::addr_of_mut!(req),
            )
        };
        let status = if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        };
        drop(socket);

        status.map_err(|e| NotFoundReason::QueryFailed(e.kind()))?;
        req.ipv4()
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "netbsd"
)))]
mod sys {
    use std::net::Ipv4Addr;

    use super::{InterfaceName, NotFoundReason};

    pub(super) fn query(_name: &InterfaceName) -> Result<Ipv4Addr, NotFoundReason> {
        Err(NotFoundReason::Unsupported)
    }
}
