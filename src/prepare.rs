// SPDX-License-Identifier: MIT

//! The interface preparer.
//!
//! Takes the requested interface from a cold start to a monitor-mode
//! interface libpcap can open: rfkill cleared, NetworkManager waved off, a
//! monitor vif created (or the interface itself switched the legacy way),
//! admin state sorted, channel list collected, pcap handle opened.

use anyhow::{bail, Context};
use log::debug;

use crate::control::ControlPlane;
use crate::framework::proto::MessageLevel;
use crate::framework::FrameworkHandle;
use crate::netif;
use crate::nl80211::Nl80211MonitorFlags;
use crate::rfkill::{self, RfkillKind};
use crate::source::SourceDefinition;
use crate::wext::{self, WirelessMode};

#[cfg(feature = "networkmanager")]
use crate::nm;

/// Snap length for the pcap handle; radiotap + a full 802.11 frame fit
/// comfortably.
const MAX_PACKET_LEN: i32 = 8192;

/// Base name for disassociated monitor interfaces when `<parent>mon` does
/// not fit in IFNAMSIZ.
const FALLBACK_VIF_BASE: &str = "kismon";

pub struct PreparedCapture {
    pub capture_ifname: String,
    pub capture_ifindex: u32,
    pub capture: pcap::Capture<pcap::Active>,
    pub datalink: i32,
    pub channels: Vec<String>,
    pub hwaddr: [u8; 6],
    pub restore_nm_on_exit: bool,
}

/// Drive the whole preparation sequence. Any error is fatal for this open
/// attempt and already carries the full single-line story.
pub async fn prepare(
    control: &mut ControlPlane,
    fw: &FrameworkHandle,
    def: &SourceDefinition,
) -> anyhow::Result<PreparedCapture> {
    let parent = def.interface();

    let hwaddr = netif::get_hwaddr(parent).with_context(|| {
        format!("Could not fetch interface address from '{parent}'")
    })?;

    if rfkill::get(parent, RfkillKind::Hard).unwrap_or(false) {
        bail!(
            "Interface '{parent}' is set to hard rfkill; check your wireless \
             switch if you have one."
        );
    }
    if rfkill::get(parent, RfkillKind::Soft).unwrap_or(false) {
        rfkill::clear(parent).with_context(|| {
            format!("Unable to activate interface '{parent}' set to soft rfkill")
        })?;
        fw.send_message(
            MessageLevel::Info,
            format!("Removed soft-rfkill and enabled interface '{parent}'"),
        )
        .await;
    }

    let restore_nm_on_exit = quiesce_network_manager(fw, parent).await;

    // Even nl80211 drivers answer SIOCGIWMODE; a miss just means we treat
    // the interface as not-monitor.
    let mode = wext::get_mode(parent).ok();
    let already_monitor = mode == Some(WirelessMode::Monitor);

    let mut capture_ifname = if already_monitor {
        fw.send_message(
            MessageLevel::Info,
            format!(
                "Interface '{parent}' is already in monitor mode, we'll \
                 use it as-is."
            ),
        )
        .await;
        parent.to_string()
    } else {
        pick_monitor_name(fw, def, parent, &hwaddr).await?
    };

    // Create the monitor vif over netlink where possible; otherwise fall
    // back to switching the parent itself with the legacy ioctls.
    if !already_monitor {
        if control.use_netlink() && capture_ifname != parent {
            match create_monitor_vif(control, fw, def, parent, &capture_ifname)
                .await
            {
                Ok(()) => {
                    fw.send_message(
                        MessageLevel::Info,
                        format!(
                            "Successfully created monitor interface \
                             '{capture_ifname}' for interface '{parent}'"
                        ),
                    )
                    .await;
                }
                Err(e) => {
                    fw.send_message(
                        MessageLevel::Error,
                        format!(
                            "Failed to create monitor vif interface \
                             '{capture_ifname}' for interface '{parent}': {e}"
                        ),
                    )
                    .await;
                    legacy_monitor(control, fw, parent).await?;
                    capture_ifname = parent.to_string();
                }
            }
        } else if wext::get_mode(&capture_ifname).ok()
            != Some(WirelessMode::Monitor)
        {
            // No netlink, or the capture name is the parent itself.
            legacy_monitor(control, fw, parent).await?;
            capture_ifname = parent.to_string();
        }
    }

    // Bring the vif up (and usually the parent down first, so the managed
    // side stops fighting over the radio).
    if capture_ifname != parent {
        if def.flag_enabled("ignoreprimary") {
            fw.send_message(
                MessageLevel::Info,
                format!(
                    "Source '{parent}' ignoring state of primary interface \
                     and leaving it in an 'up' state; this may cause \
                     problems with channel hopping."
                ),
            )
            .await;
        } else {
            fw.send_message(
                MessageLevel::Info,
                format!("Bringing down parent interface '{parent}'"),
            )
            .await;
            netif::down(parent).with_context(|| {
                format!(
                    "Could not bring down parent interface '{parent}' to \
                     capture using '{capture_ifname}'"
                )
            })?;
        }
    }

    netif::up(&capture_ifname).with_context(|| {
        format!(
            "Could not bring up capture interface '{capture_ifname}', check \
             'dmesg' for errors loading firmware"
        )
    })?;

    let channels = control.channel_list(&capture_ifname).await;
    if channels.is_empty() {
        fw.send_message(
            MessageLevel::Info,
            format!("0 channels on interface '{capture_ifname}'"),
        )
        .await;
    }

    let capture = pcap::Capture::from_device(capture_ifname.as_str())
        .with_context(|| {
            format!("Could not look up capture interface '{capture_ifname}'")
        })?
        .snaplen(MAX_PACKET_LEN)
        .promisc(true)
        .timeout(1000)
        .open()
        .with_context(|| {
            format!(
                "Could not open capture interface '{capture_ifname}' on \
                 '{parent}' as a pcap capture"
            )
        })?;
    let datalink = capture.get_datalink().0;
    debug!("pcap open on '{capture_ifname}', datalink {datalink}");

    let capture_ifindex = netif::index_of(&capture_ifname).unwrap_or(0);

    Ok(PreparedCapture {
        capture_ifname,
        capture_ifindex,
        capture,
        datalink,
        channels,
        hwaddr,
        restore_nm_on_exit,
    })
}

/// Ask NetworkManager to leave the interface alone for the duration of the
/// capture. Returns whether management needs to be handed back on exit.
/// Never fatal; the NM connection does not outlive the call (a lingering
/// client keeps receiving state reports for the rest of the capture).
#[cfg(feature = "networkmanager")]
async fn quiesce_network_manager(fw: &FrameworkHandle, parent: &str) -> bool {
    match nm::quiesce(parent).await {
        Ok(true) => {
            fw.send_message(
                MessageLevel::Info,
                format!(
                    "Telling NetworkManager not to control interface \
                     '{parent}': you may need to re-initialize this \
                     interface later or tell NetworkManager to control it \
                     again via 'nmcli'"
                ),
            )
            .await;
            true
        }
        Ok(false) => false,
        Err(e) => {
            fw.send_message(
                MessageLevel::Info,
                format!(
                    "Could not connect to NetworkManager, cannot \
                     automatically prevent interface '{parent}' from being \
                     modified if NetworkManager is running: {e}"
                ),
            )
            .await;
            false
        }
    }
}

#[cfg(not(feature = "networkmanager"))]
async fn quiesce_network_manager(_fw: &FrameworkHandle, _parent: &str) -> bool {
    false
}

/// Decide what the monitor interface should be called, preferring in order:
/// an explicit `vif=` flag, an existing monitor sibling sharing our
/// hardware address, `<parent>mon` when it fits, and finally a free
/// `kismonN` slot.
async fn pick_monitor_name(
    fw: &FrameworkHandle,
    def: &SourceDefinition,
    parent: &str,
    hwaddr: &[u8; 6],
) -> anyhow::Result<String> {
    if let Some(vif) = def.option("vif") {
        return Ok(vif.to_string());
    }

    if let Some(existing) = find_monitor_sibling(parent, hwaddr) {
        fw.send_message(
            MessageLevel::Info,
            format!(
                "Found existing monitor interface '{existing}' for \
                 '{parent}', we'll use that."
            ),
        )
        .await;
        return Ok(existing);
    }

    if monitor_name_fits(parent) {
        let name = format!("{parent}mon");
        if netif::exists(&name)
            && wext::get_mode(&name).ok() != Some(WirelessMode::Monitor)
        {
            bail!(
                "A monitor vif already exists for interface '{parent}' \
                 ({name}) but isn't in monitor mode; check that \
                 NetworkManager isn't hijacking the interface, delete the \
                 false monitor vif, and try again."
            );
        }
        return Ok(name);
    }

    match next_free_ifnum(FALLBACK_VIF_BASE, &netif::exists) {
        Some(n) => Ok(format!("{FALLBACK_VIF_BASE}{n}")),
        None => bail!(
            "Could not append 'mon' extension to existing interface \
             ({parent}) and could not find a {FALLBACK_VIF_BASE}N within \
             100 tries"
        ),
    }
}

/// `<parent>mon` must leave room for the NUL inside IFNAMSIZ.
pub(crate) fn monitor_name_fits(parent: &str) -> bool {
    parent.len() + 3 < libc::IFNAMSIZ
}

/// Smallest N below 100 such that `<base>N` names no existing interface.
pub(crate) fn next_free_ifnum(
    base: &str,
    exists: &dyn Fn(&str) -> bool,
) -> Option<u32> {
    (0..100).find(|n| !exists(&format!("{base}{n}")))
}

/// A monitor-mode interface sharing our hardware address under a different
/// name, usually left over from a previous run.
fn find_monitor_sibling(parent: &str, hwaddr: &[u8; 6]) -> Option<String> {
    let names = netif::interface_names().ok()?;
    names.into_iter().find(|name| {
        name != parent
            && netif::get_hwaddr(name)
                .map(|mac| mac == *hwaddr)
                .unwrap_or(false)
            && wext::get_mode(name).ok() == Some(WirelessMode::Monitor)
    })
}

async fn create_monitor_vif(
    control: &ControlPlane,
    fw: &FrameworkHandle,
    def: &SourceDefinition,
    parent: &str,
    name: &str,
) -> Result<(), String> {
    let mut flags =
        Nl80211MonitorFlags::Control | Nl80211MonitorFlags::OtherBss;
    if def.flag_enabled("fcsfail") {
        fw.send_message(
            MessageLevel::Info,
            format!(
                "Source '{parent}' configuring monitor interface to pass \
                 packets which fail FCS checksum"
            ),
        )
        .await;
        flags |= Nl80211MonitorFlags::FcsFail;
    }
    if def.flag_enabled("plcpfail") {
        fw.send_message(
            MessageLevel::Info,
            format!(
                "Source '{parent}' configuring monitor interface to pass \
                 packets which fail PLCP checksum"
            ),
        )
        .await;
        flags |= Nl80211MonitorFlags::PlcpFail;
    }

    let session = control
        .session()
        .ok_or_else(|| "netlink session is gone".to_string())?;
    let parent_index = netif::index_of(parent)
        .ok_or_else(|| format!("interface '{parent}' does not exist"))?;
    session
        .create_monitor_vif(parent_index, name, flags)
        .await
        .map_err(|e| e.to_string())
}

/// Last resort: flip the parent interface itself into monitor mode with the
/// legacy ioctls and capture from it directly. The netlink session is
/// released so later channel sets stay on the legacy path.
async fn legacy_monitor(
    control: &mut ControlPlane,
    fw: &FrameworkHandle,
    parent: &str,
) -> anyhow::Result<()> {
    if let Err(e) = wext::set_mode(parent, WirelessMode::Monitor) {
        fw.send_message(
            MessageLevel::Error,
            format!("Failed to put interface '{parent}' in monitor mode: {e}"),
        )
        .await;
        bail!(
            "Failed to create a monitor vif and could not set mode of \
             existing interface, unable to put '{parent}' into monitor mode."
        );
    }
    fw.send_message(
        MessageLevel::Info,
        format!(
            "Configured '{parent}' as monitor mode interface instead of \
             using a monitor vif; will continue using this interface as \
             the capture source."
        ),
    )
    .await;
    control.abandon_netlink();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn monitor_name_length_budget() {
        // IFNAMSIZ is 16 with the NUL: 12 characters still take "mon".
        assert!(monitor_name_fits("wlan0"));
        assert!(monitor_name_fits("wlp2s0"));
        assert!(!monitor_name_fits("wlan_very_long_name_here"));
        assert!(!monitor_name_fits("abcdefghijklm"));
        assert!(monitor_name_fits("abcdefghijkl"));
    }

    #[test]
    fn fallback_name_picks_first_gap() {
        let taken: Vec<String> = vec![];
        assert_eq!(
            next_free_ifnum("kismon", &|n| taken.iter().any(|t| t == n)),
            Some(0)
        );

        let taken = ["kismon0".to_string()];
        assert_eq!(
            next_free_ifnum("kismon", &|n| taken.iter().any(|t| t == n)),
            Some(1)
        );

        let taken: Vec<String> =
            (0..3).map(|n| format!("kismon{n}")).collect();
        assert_eq!(
            next_free_ifnum("kismon", &|n| taken.iter().any(|t| t == n)),
            Some(3)
        );
    }

    #[test]
    fn fallback_name_exhaustion() {
        assert_eq!(next_free_ifnum("kismon", &|_| true), None);
    }
}
