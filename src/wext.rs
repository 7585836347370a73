// SPDX-License-Identifier: MIT

//! Legacy wireless-extension ioctls.
//!
//! Old drivers predating mac80211 are tuned through `SIOCSIWFREQ` and
//! friends. Even modern drivers still answer the read-side calls, which is
//! why mode probing and wireless detection live here rather than on the
//! netlink path.
//!
//! The kernel copies a full `struct iwreq` (ifname plus a 16-byte union) for
//! every request, so each request struct below pads its payload out to the
//! union size.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use crate::ht_table::channel_from_mhz;
use crate::netif;

const SIOCSIWFREQ: libc::c_ulong = 0x8B04;
const SIOCGIWFREQ: libc::c_ulong = 0x8B05;
const SIOCSIWMODE: libc::c_ulong = 0x8B06;
const SIOCGIWMODE: libc::c_ulong = 0x8B07;
const SIOCGIWRANGE: libc::c_ulong = 0x8B0B;

const IW_FREQ_FIXED: u8 = 0x01;

const IW_MAX_BITRATES: usize = 32;
const IW_MAX_ENCODING_SIZES: usize = 8;
const IW_MAX_FREQUENCIES: usize = 32;
const IW_MAX_TXPOWER: usize = 8;

const IW_UNION_SIZE: usize = 16;

const IW_MODE_AUTO: u32 = 0;
const IW_MODE_ADHOC: u32 = 1;
const IW_MODE_INFRA: u32 = 2;
const IW_MODE_MASTER: u32 = 3;
const IW_MODE_REPEAT: u32 = 4;
const IW_MODE_SECOND: u32 = 5;
const IW_MODE_MONITOR: u32 = 6;
const IW_MODE_MESH: u32 = 7;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WirelessMode {
    Auto,
    AdHoc,
    Infra,
    Master,
    Repeat,
    Second,
    Monitor,
    Mesh,
    Other(u32),
}

impl From<u32> for WirelessMode {
    fn from(d: u32) -> Self {
        match d {
            IW_MODE_AUTO => Self::Auto,
            IW_MODE_ADHOC => Self::AdHoc,
            IW_MODE_INFRA => Self::Infra,
            IW_MODE_MASTER => Self::Master,
            IW_MODE_REPEAT => Self::Repeat,
            IW_MODE_SECOND => Self::Second,
            IW_MODE_MONITOR => Self::Monitor,
            IW_MODE_MESH => Self::Mesh,
            _ => Self::Other(d),
        }
    }
}

impl From<WirelessMode> for u32 {
    fn from(v: WirelessMode) -> u32 {
        match v {
            WirelessMode::Auto => IW_MODE_AUTO,
            WirelessMode::AdHoc => IW_MODE_ADHOC,
            WirelessMode::Infra => IW_MODE_INFRA,
            WirelessMode::Master => IW_MODE_MASTER,
            WirelessMode::Repeat => IW_MODE_REPEAT,
            WirelessMode::Second => IW_MODE_SECOND,
            WirelessMode::Monitor => IW_MODE_MONITOR,
            WirelessMode::Mesh => IW_MODE_MESH,
            WirelessMode::Other(d) => d,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct IwFreq {
    m: i32,
    e: i16,
    i: u8,
    flags: u8,
}

impl IwFreq {
    fn to_mhz_or_channel(self) -> u32 {
        let value = f64::from(self.m) * 10f64.powi(i32::from(self.e));
        if value < 1000.0 {
            // Small values are channel numbers, not frequencies.
            value as u32
        } else {
            (value / 1_000_000.0) as u32
        }
    }
}

#[repr(C)]
struct IwReqU32 {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    value: u32,
    _pad: [u8; IW_UNION_SIZE - 4],
}

#[repr(C)]
struct IwReqFreq {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    freq: IwFreq,
    _pad: [u8; IW_UNION_SIZE - std::mem::size_of::<IwFreq>()],
}

#[repr(C)]
struct IwPoint {
    pointer: *mut libc::c_void,
    length: u16,
    flags: u16,
}

#[repr(C)]
struct IwReqPoint {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    data: IwPoint,
    _pad: [u8; IW_UNION_SIZE.saturating_sub(std::mem::size_of::<IwPoint>())],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct IwQuality {
    qual: u8,
    level: u8,
    noise: u8,
    updated: u8,
}

/// `struct iw_range` from the wireless extensions ABI (WE-22). Only the
/// frequency table at the tail is interesting here, but the offsets before
/// it have to be exact.
#[repr(C)]
#[derive(Clone, Copy)]
struct IwRange {
    throughput: u32,
    min_nwid: u32,
    max_nwid: u32,
    old_num_channels: u16,
    old_num_frequency: u8,
    scan_capa: u8,
    event_capa: [u32; 6],
    sensitivity: i32,
    max_qual: IwQuality,
    avg_qual: IwQuality,
    num_bitrates: u8,
    bitrate: [i32; IW_MAX_BITRATES],
    min_rts: i32,
    max_rts: i32,
    min_frag: i32,
    max_frag: i32,
    min_pmp: i32,
    max_pmp: i32,
    min_pmt: i32,
    max_pmt: i32,
    pmp_flags: u16,
    pmt_flags: u16,
    pm_capa: u16,
    encoding_size: [u16; IW_MAX_ENCODING_SIZES],
    num_encoding_sizes: u8,
    max_encoding_tokens: u8,
    encoding_login_index: u8,
    txpower_capa: u16,
    num_txpower: u8,
    txpower: [i32; IW_MAX_TXPOWER],
    we_version_compiled: u8,
    we_version_source: u8,
    retry_capa: u16,
    retry_flags: u16,
    r_time_flags: u16,
    min_retry: i32,
    max_retry: i32,
    min_r_time: i32,
    max_r_time: i32,
    num_channels: u16,
    num_frequency: u8,
    freq: [IwFreq; IW_MAX_FREQUENCIES],
    enc_capa: u32,
}

fn control_socket() -> io::Result<OwnedFd> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn ifname_array(name: &str) -> io::Result<[libc::c_char; libc::IFNAMSIZ]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= libc::IFNAMSIZ {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid interface name '{name}'"),
        ));
    }
    let mut arr = [0 as libc::c_char; libc::IFNAMSIZ];
    for (dst, src) in arr.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }
    Ok(arr)
}

fn ioctl<T>(fd: &OwnedFd, request: libc::c_ulong, data: &mut T) -> io::Result<()> {
    let rc = unsafe { libc::ioctl(fd.as_raw_fd(), request as _, data as *mut T) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn get_mode(ifname: &str) -> io::Result<WirelessMode> {
    let fd = control_socket()?;
    let mut req = IwReqU32 {
        ifr_name: ifname_array(ifname)?,
        value: 0,
        _pad: [0; IW_UNION_SIZE - 4],
    };
    ioctl(&fd, SIOCGIWMODE, &mut req)?;
    Ok(WirelessMode::from(req.value))
}

/// Switch the wireless operating mode.
///
/// The kernel refuses mode changes on a running interface, so the interface
/// is brought admin-down for the change and its previous flags restored
/// afterwards.
pub fn set_mode(ifname: &str, mode: WirelessMode) -> io::Result<()> {
    let old_flags = netif::get_flags(ifname)?;
    if old_flags & libc::IFF_UP as i16 != 0 {
        netif::down(ifname)?;
    }

    let fd = control_socket()?;
    let mut req = IwReqU32 {
        ifr_name: ifname_array(ifname)?,
        value: mode.into(),
        _pad: [0; IW_UNION_SIZE - 4],
    };
    let result = ioctl(&fd, SIOCSIWMODE, &mut req);

    if old_flags & libc::IFF_UP as i16 != 0 {
        netif::set_flags(ifname, old_flags)?;
    }
    result
}

/// Tune to a channel number, or to a frequency when the value is too large
/// to be a channel.
pub fn set_channel(ifname: &str, channel_or_mhz: u32) -> io::Result<()> {
    let fd = control_socket()?;
    let mut freq = IwFreq {
        flags: IW_FREQ_FIXED,
        ..Default::default()
    };
    if channel_or_mhz > 1024 {
        freq.m = (channel_or_mhz * 100_000) as i32;
        freq.e = 1;
    } else {
        freq.m = channel_or_mhz as i32;
        freq.e = 0;
    }
    let mut req = IwReqFreq {
        ifr_name: ifname_array(ifname)?,
        freq,
        _pad: [0; IW_UNION_SIZE - std::mem::size_of::<IwFreq>()],
    };
    ioctl(&fd, SIOCSIWFREQ, &mut req)
}

/// Current channel, or 0 when the driver reports none.
pub fn get_channel(ifname: &str) -> io::Result<u32> {
    let fd = control_socket()?;
    let mut req = IwReqFreq {
        ifr_name: ifname_array(ifname)?,
        freq: IwFreq::default(),
        _pad: [0; IW_UNION_SIZE - std::mem::size_of::<IwFreq>()],
    };
    ioctl(&fd, SIOCGIWFREQ, &mut req)?;
    let value = req.freq.to_mhz_or_channel();
    if value > 1000 {
        Ok(channel_from_mhz(value).unwrap_or(value))
    } else {
        Ok(value)
    }
}

/// Channel numbers advertised through `SIOCGIWRANGE`, in driver order.
pub fn channel_list(ifname: &str) -> io::Result<Vec<u32>> {
    let fd = control_socket()?;
    let mut range: IwRange = unsafe { std::mem::zeroed() };
    let mut req = IwReqPoint {
        ifr_name: ifname_array(ifname)?,
        data: IwPoint {
            pointer: (&mut range as *mut IwRange).cast(),
            length: std::mem::size_of::<IwRange>() as u16,
            flags: 0,
        },
        _pad: [0; IW_UNION_SIZE.saturating_sub(std::mem::size_of::<IwPoint>())],
    };
    ioctl(&fd, SIOCGIWRANGE, &mut req)?;

    let count = (range.num_frequency as usize).min(IW_MAX_FREQUENCIES);
    let mut channels = Vec::with_capacity(count);
    for freq in &range.freq[..count] {
        let value = freq.to_mhz_or_channel();
        let chan = if value > 1000 {
            channel_from_mhz(value).unwrap_or(value)
        } else {
            value
        };
        if !channels.contains(&chan) {
            channels.push(chan);
        }
    }
    Ok(channels)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn freq_decoding() {
        // Plain channel number.
        let f = IwFreq {
            m: 6,
            e: 0,
            ..Default::default()
        };
        assert_eq!(f.to_mhz_or_channel(), 6);

        // Frequency in Hz, mantissa/exponent form.
        let f = IwFreq {
            m: 2437,
            e: 6,
            ..Default::default()
        };
        assert_eq!(f.to_mhz_or_channel(), 2437);

        let f = IwFreq {
            m: 243_700,
            e: 4,
            ..Default::default()
        };
        assert_eq!(f.to_mhz_or_channel(), 2437);
    }

    #[test]
    fn mode_roundtrip() {
        assert_eq!(WirelessMode::from(IW_MODE_MONITOR), WirelessMode::Monitor);
        assert_eq!(u32::from(WirelessMode::Monitor), IW_MODE_MONITOR);
        assert_eq!(WirelessMode::from(42), WirelessMode::Other(42));
    }

    #[test]
    fn request_structs_cover_the_union() {
        // The kernel copies ifname + a 16-byte union for every wext ioctl.
        let min = libc::IFNAMSIZ + IW_UNION_SIZE;
        assert!(std::mem::size_of::<IwReqU32>() >= min);
        assert!(std::mem::size_of::<IwReqFreq>() >= min);
        assert!(std::mem::size_of::<IwReqPoint>() >= min);
    }
}
