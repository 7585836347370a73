// SPDX-License-Identifier: MIT

//! Plain network-interface plumbing: hardware addresses, admin flags, and
//! enumeration. Everything here works on any interface, wireless or not.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

fn control_socket() -> io::Result<OwnedFd> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn ifreq_for(name: &str) -> io::Result<libc::ifreq> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= libc::IFNAMSIZ {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid interface name '{name}'"),
        ));
    }
    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in ifr.ifr_name.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }
    Ok(ifr)
}

fn ioctl(fd: &OwnedFd, request: libc::c_ulong, ifr: &mut libc::ifreq) -> io::Result<()> {
    let rc = unsafe { libc::ioctl(fd.as_raw_fd(), request as _, ifr as *mut libc::ifreq) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// EUI-48 of the interface.
pub fn get_hwaddr(ifname: &str) -> io::Result<[u8; 6]> {
    let fd = control_socket()?;
    let mut ifr = ifreq_for(ifname)?;
    ioctl(&fd, libc::SIOCGIFHWADDR as _, &mut ifr)?;
    let sa_data = unsafe { ifr.ifr_ifru.ifru_hwaddr.sa_data };
    let mut mac = [0u8; 6];
    for (dst, src) in mac.iter_mut().zip(&sa_data[..6]) {
        *dst = *src as u8;
    }
    Ok(mac)
}

pub fn get_flags(ifname: &str) -> io::Result<i16> {
    let fd = control_socket()?;
    let mut ifr = ifreq_for(ifname)?;
    ioctl(&fd, libc::SIOCGIFFLAGS as _, &mut ifr)?;
    Ok(unsafe { ifr.ifr_ifru.ifru_flags })
}

pub fn set_flags(ifname: &str, flags: i16) -> io::Result<()> {
    let fd = control_socket()?;
    let mut ifr = ifreq_for(ifname)?;
    ifr.ifr_ifru.ifru_flags = flags;
    ioctl(&fd, libc::SIOCSIFFLAGS as _, &mut ifr)
}

pub fn up(ifname: &str) -> io::Result<()> {
    let flags = get_flags(ifname)?;
    set_flags(
        ifname,
        flags | libc::IFF_UP as i16 | libc::IFF_RUNNING as i16,
    )
}

pub fn down(ifname: &str) -> io::Result<()> {
    let flags = get_flags(ifname)?;
    set_flags(ifname, flags & !(libc::IFF_UP as i16))
}

pub fn is_up(ifname: &str) -> io::Result<bool> {
    Ok(get_flags(ifname)? & libc::IFF_UP as i16 != 0)
}

/// Kernel interface index, or `None` when no such interface exists.
pub fn index_of(ifname: &str) -> Option<u32> {
    nix::net::if_::if_nametoindex(ifname).ok()
}

pub fn exists(ifname: &str) -> bool {
    index_of(ifname).is_some()
}

/// All interface names, deduplicated, in enumeration order.
pub fn interface_names() -> io::Result<Vec<String>> {
    let addrs = nix::ifaddrs::getifaddrs().map_err(io::Error::from)?;
    let mut names: Vec<String> = Vec::new();
    for addr in addrs {
        if !names.contains(&addr.interface_name) {
            names.push(addr.interface_name);
        }
    }
    Ok(names)
}
