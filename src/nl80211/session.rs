// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use futures::TryStreamExt;
use netlink_packet_core::{NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST};

use crate::ht_table::{channel_from_mhz, lookup_ht_channel, HtFlags};

use super::{
    nl80211_execute, Nl80211Attr, Nl80211ChannelWidth, Nl80211Command,
    Nl80211Error, Nl80211Handle, Nl80211HtChannelType, Nl80211InterfaceType,
    Nl80211Message, Nl80211MonitorFlags,
};

/// An open nl80211 control session.
///
/// Owns the spawned netlink connection task; dropping (or releasing) the
/// session tears the socket down, which is what the legacy fallthrough path
/// relies on.
#[derive(Debug)]
pub struct Nl80211Session {
    handle: Nl80211Handle,
    connection: tokio::task::JoinHandle<()>,
}

impl Nl80211Session {
    /// Open the generic netlink socket and resolve the nl80211 family.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect() -> Result<Self, Nl80211Error> {
        let (connection, handle, _messages) = super::new_connection()?;
        let connection = tokio::spawn(connection);
        Ok(Self { handle, connection })
    }

    /// Drop the netlink control plane, closing the socket.
    pub fn release(self) {}

    /// Create a monitor virtual interface on the phy backing `parent_index`.
    pub async fn create_monitor_vif(
        &self,
        parent_index: u32,
        name: &str,
        flags: Nl80211MonitorFlags,
    ) -> Result<(), Nl80211Error> {
        self.execute_ack(Nl80211Message {
            cmd: Nl80211Command::NewInterface,
            attributes: vec![
                Nl80211Attr::IfIndex(parent_index),
                Nl80211Attr::IfName(name.to_string()),
                Nl80211Attr::IfType(Nl80211InterfaceType::Monitor),
                Nl80211Attr::MntrFlags(flags),
            ],
        })
        .await
    }

    /// Tune using the legacy channel-type attribute (non-HT and HT40).
    pub async fn set_channel(
        &self,
        if_index: u32,
        control_freq: u32,
        chan_type: Nl80211HtChannelType,
    ) -> Result<(), Nl80211Error> {
        self.execute_ack(Nl80211Message {
            cmd: Nl80211Command::SetChannel,
            attributes: vec![
                Nl80211Attr::IfIndex(if_index),
                Nl80211Attr::WiphyFreq(control_freq),
                Nl80211Attr::WiphyChannelType(chan_type),
            ],
        })
        .await
    }

    /// Tune using an explicit channel width. Zero center frequencies are
    /// left out of the request entirely.
    pub async fn set_frequency(
        &self,
        if_index: u32,
        control_freq: u32,
        width: Nl80211ChannelWidth,
        center_freq1: u32,
        center_freq2: u32,
    ) -> Result<(), Nl80211Error> {
        let mut attributes = vec![
            Nl80211Attr::IfIndex(if_index),
            Nl80211Attr::WiphyFreq(control_freq),
            Nl80211Attr::ChannelWidth(width),
        ];
        if center_freq1 != 0 {
            attributes.push(Nl80211Attr::CenterFreq1(center_freq1));
        }
        if center_freq2 != 0 {
            attributes.push(Nl80211Attr::CenterFreq2(center_freq2));
        }
        self.execute_ack(Nl80211Message {
            cmd: Nl80211Command::SetChannel,
            attributes,
        })
        .await
    }

    /// Build the advertised channel list for the phy backing `if_index`.
    ///
    /// Every usable control frequency contributes its base channel plus the
    /// wider variants the driver and the channel table agree on.
    pub async fn channel_strings(
        &self,
        if_index: u32,
    ) -> Result<Vec<String>, Nl80211Error> {
        let mut handle = self.handle.clone();
        let stream = nl80211_execute(
            &mut handle,
            Nl80211Message {
                cmd: Nl80211Command::GetWiphy,
                attributes: vec![
                    Nl80211Attr::IfIndex(if_index),
                    Nl80211Attr::SplitWiphyDump,
                ],
            },
            NLM_F_REQUEST | NLM_F_DUMP,
        )
        .await;
        futures::pin_mut!(stream);

        let mut seen = HashSet::new();
        let mut channels = Vec::new();
        let mut push = |s: String| {
            if seen.insert(s.clone()) {
                channels.push(s);
            }
        };

        while let Some(msg) = stream.try_next().await? {
            for attr in msg.payload.attributes {
                let Nl80211Attr::WiphyBands(bands) = attr else {
                    continue;
                };
                for band in &bands {
                    for freq in band.frequencies() {
                        if freq.disabled() {
                            continue;
                        }
                        let Some(mhz) = freq.mhz() else {
                            continue;
                        };
                        let chan = channel_from_mhz(mhz);
                        let base = match chan {
                            Some(chan) => chan.to_string(),
                            None => mhz.to_string(),
                        };
                        push(base.clone());
                        if freq.ht40_minus() {
                            push(format!("{base}HT40-"));
                        }
                        if freq.ht40_plus() {
                            push(format!("{base}HT40+"));
                        }
                        if let Some(entry) = chan.and_then(lookup_ht_channel)
                        {
                            if freq.vht80()
                                && entry.flags.contains(HtFlags::VHT80)
                            {
                                push(format!("{base}VHT80"));
                            }
                            if freq.vht160()
                                && entry.flags.contains(HtFlags::VHT160)
                            {
                                push(format!("{base}VHT160"));
                            }
                        }
                    }
                }
            }
        }
        Ok(channels)
    }

    async fn execute_ack(
        &self,
        msg: Nl80211Message,
    ) -> Result<(), Nl80211Error> {
        let mut handle = self.handle.clone();
        let stream =
            nl80211_execute(&mut handle, msg, NLM_F_REQUEST | NLM_F_ACK).await;
        futures::pin_mut!(stream);
        while stream.try_next().await?.is_some() {}
        Ok(())
    }
}

impl Drop for Nl80211Session {
    fn drop(&mut self) {
        self.connection.abort();
    }
}
