//! Interface flag and address ioctls (Linux).

use std::io;
use std::net::Ipv4Addr;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use libc::{c_char, c_short, c_ulong, c_void, ioctl, sockaddr_in, socket, AF_INET, SOCK_DGRAM};

/// SIOCGIFFLAGS - Get interface flags.
const SIOCGIFFLAGS: c_ulong = 0x8913;

/// SIOCSIFFLAGS - Set interface flags.
const SIOCSIFFLAGS: c_ulong = 0x8914;

/// SIOCSIFADDR - Set interface address.
const SIOCSIFADDR: c_ulong = 0x8916;

/// SIOCSIFNETMASK - Set interface netmask.
const SIOCSIFNETMASK: c_ulong = 0x891c;

pub const IFF_UP: c_short = 0x1;
pub const IFF_RUNNING: c_short = 0x40;

/// Kernel limit on interface names, including the NUL.
pub const IFNAMSIZ: usize = 16;

/// `struct ifreq` carrying flags. Padded to the kernel's 40 bytes.
#[repr(C)]
struct IfReqFlags {
    ifr_name: [c_char; IFNAMSIZ],
    ifr_flags: c_short,
    _pad: [u8; 22],
}

/// `struct ifreq` carrying an IPv4 sockaddr.
#[repr(C)]
struct IfReqAddr {
    ifr_name: [c_char; IFNAMSIZ],
    ifr_addr: sockaddr_in,
    _pad: [u8; 8],
}

fn control_socket() -> io::Result<OwnedFd> {
    let fd = unsafe { socket(AF_INET, SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn ifr_name(name: &str) -> io::Result<[c_char; IFNAMSIZ]> {
    if name.is_empty() || name.len() >= IFNAMSIZ {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("interface name {name:?} must be 1..{} bytes", IFNAMSIZ - 1),
        ));
    }
    let mut buf = [0 as c_char; IFNAMSIZ];
    for (slot, byte) in buf.iter_mut().zip(name.bytes()) {
        *slot = byte as c_char;
    }
    Ok(buf)
}

fn request<T>(request: c_ulong, req: &mut T) -> io::Result<()> {
    let sock = control_socket()?;
    let rc = unsafe { ioctl(sock.as_raw_fd(), request as _, req as *mut T as *mut c_void) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn get_flags(name: &str) -> io::Result<c_short> {
    let mut ifr = IfReqFlags {
        ifr_name: ifr_name(name)?,
        ifr_flags: 0,
        _pad: [0; 22],
    };
    request(SIOCGIFFLAGS, &mut ifr)?;
    Ok(ifr.ifr_flags)
}

pub fn set_flags(name: &str, flags: c_short) -> io::Result<()> {
    let mut ifr = IfReqFlags {
        ifr_name: ifr_name(name)?,
        ifr_flags: flags,
        _pad: [0; 22],
    };
    request(SIOCSIFFLAGS, &mut ifr)
}

fn set_inet(name: &str, request_code: c_ulong, addr: Ipv4Addr) -> io::Result<()> {
    let mut sin: sockaddr_in = unsafe { std::mem::zeroed() };
    sin.sin_family = AF_INET as libc::sa_family_t;
    sin.sin_port = 0;
    sin.sin_addr.s_addr = u32::from_ne_bytes(addr.octets());

    let mut ifr = IfReqAddr {
        ifr_name: ifr_name(name)?,
        ifr_addr: sin,
        _pad: [0; 8],
    };
    request(request_code, &mut ifr)
}

pub fn set_address(name: &str, addr: Ipv4Addr) -> io::Result<()> {
    set_inet(name, SIOCSIFADDR, addr)
}

pub fn set_netmask(name: &str, mask: Ipv4Addr) -> io::Result<()> {
    set_inet(name, SIOCSIFNETMASK, mask)
}
