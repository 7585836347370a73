// SPDX-License-Identifier: MIT

//! The wireless control plane.
//!
//! Every control operation prefers nl80211; the wireless-extension ioctls
//! are the fallback for drivers that predate mac80211. The choice is made
//! once per interface and then sticks: when the netlink path is abandoned
//! (vif creation failed and the parent was switched to monitor the legacy
//! way), `use_netlink` flips off and all later channel sets take the legacy
//! path too.

use log::debug;

use crate::netif;
use crate::nl80211::Nl80211Session;
use crate::wext;

#[derive(Debug, Default)]
pub struct ControlPlane {
    netlink: Option<Nl80211Session>,
    use_netlink: bool,
}

impl ControlPlane {
    /// Try to bring up the netlink control plane. Failure is quiet; the
    /// legacy path covers everything except vif creation and wide channels.
    pub fn connect() -> Self {
        match Nl80211Session::connect() {
            Ok(session) => ControlPlane {
                netlink: Some(session),
                use_netlink: true,
            },
            Err(e) => {
                debug!("nl80211 unavailable, using wireless extensions: {e}");
                ControlPlane::default()
            }
        }
    }

    pub fn use_netlink(&self) -> bool {
        self.use_netlink
    }

    pub fn session(&self) -> Option<&Nl80211Session> {
        if self.use_netlink {
            self.netlink.as_ref()
        } else {
            None
        }
    }

    /// Drop the netlink session and route all subsequent operations through
    /// the legacy backend.
    pub fn abandon_netlink(&mut self) {
        if let Some(session) = self.netlink.take() {
            session.release();
        }
        self.use_netlink = false;
    }

    /// Channel list for an interface: rich HT/VHT strings from the netlink
    /// backend, bare channel numbers from the legacy one. An empty list
    /// means neither backend could answer.
    pub async fn channel_list(&self, ifname: &str) -> Vec<String> {
        if let (Some(session), Some(if_index)) =
            (self.session(), netif::index_of(ifname))
        {
            match session.channel_strings(if_index).await {
                Ok(channels) if !channels.is_empty() => return channels,
                Ok(_) => {}
                Err(e) => {
                    debug!("netlink channel list for '{ifname}' failed: {e}")
                }
            }
        }

        match wext::channel_list(ifname) {
            Ok(channels) => {
                channels.into_iter().map(|c| c.to_string()).collect()
            }
            Err(e) => {
                debug!("wext channel list for '{ifname}' failed: {e}");
                Vec::new()
            }
        }
    }
}
