// SPDX-License-Identifier: MIT

//! The Wi-Fi datasource: per-process interface state plus the callbacks the
//! capture framework drives.
//!
//! All state here is owned by the event loop. The capture thread only ever
//! receives copies made at open time, so the two sides never share mutable
//! state.

use std::fs;

use log::debug;

use crate::capture;
use crate::chancontrol::{self, FailurePolicy, TuneVerdict};
use crate::channel::ChannelDescriptor;
use crate::control::ControlPlane;
use crate::framework::proto::{
    ConfigureResponse, DeviceRecord, Frame, FrameKind, MessageLevel,
    OpenResponse,
};
use crate::framework::{ChannelSetOutcome, DataSource, FrameworkHandle};
use crate::ident::source_uuid;
use crate::prepare;
use crate::source::SourceDefinition;
use crate::wext;

#[cfg(feature = "networkmanager")]
use crate::nm;

#[derive(Default)]
pub struct WifiSource {
    /// Interface named by the source definition.
    interface: Option<String>,
    /// Interface frames are actually read from, once open succeeds.
    capture_ifname: Option<String>,
    capture_ifindex: u32,
    datalink: i32,
    control: Option<ControlPlane>,
    policy: FailurePolicy,
    restore_nm_on_exit: bool,
    /// Held between open and the capture-thread handoff.
    pending_capture: Option<pcap::Capture<pcap::Active>>,
}

impl WifiSource {
    pub fn new() -> Self {
        WifiSource::default()
    }

    /// Hand the parent interface back to NetworkManager if open took it
    /// away. Called once, after the command loop has exited.
    pub async fn teardown(&self) {
        #[cfg(feature = "networkmanager")]
        if self.restore_nm_on_exit {
            if let Some(interface) = &self.interface {
                if let Err(e) = nm::restore(interface).await {
                    log::warn!(
                        "could not hand '{interface}' back to \
                         NetworkManager: {e}"
                    );
                }
            }
        }
    }
}

impl DataSource for WifiSource {
    async fn list(
        &mut self,
        _fw: &FrameworkHandle,
    ) -> Result<Vec<DeviceRecord>, String> {
        let entries = match fs::read_dir("/sys/class/net") {
            Ok(entries) => entries,
            // Nothing to enumerate is not an error, just an empty list.
            Err(e) => {
                debug!("no /sys/class/net: {e}");
                return Ok(vec![]);
            }
        };

        let mut devices = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Anything that answers a wireless channel query is Wi-Fi;
            // even nl80211 drivers respond to the legacy call.
            if wext::get_channel(&name).map(|c| c > 0).unwrap_or(false) {
                debug!("found wireless device {name}");
                devices.push(DeviceRecord {
                    device: name,
                    flags: String::new(),
                });
            }
        }
        Ok(devices)
    }

    async fn probe(
        &mut self,
        _fw: &FrameworkHandle,
        definition: &str,
    ) -> Result<Vec<String>, String> {
        let def =
            SourceDefinition::parse(definition).map_err(|e| e.to_string())?;
        // Probing must not disturb any open capture, so it gets its own
        // short-lived control plane.
        let control = ControlPlane::connect();
        Ok(control.channel_list(def.interface()).await)
    }

    async fn open(
        &mut self,
        fw: &FrameworkHandle,
        definition: &str,
    ) -> Result<OpenResponse, String> {
        let def =
            SourceDefinition::parse(definition).map_err(|e| e.to_string())?;
        let parent = def.interface().to_string();

        let mut control = ControlPlane::connect();
        let prepared = prepare::prepare(&mut control, fw, &def)
            .await
            .map_err(|e| format!("{e:#}"))?;

        let uuid = source_uuid(&prepared.hwaddr);
        debug!("generated uuid {uuid} for {parent}");

        let msg = if prepared.capture_ifname != parent {
            format!(
                "Linux Wi-Fi capturing from monitor vif \
                 '{}' on interface '{parent}'",
                prepared.capture_ifname
            )
        } else {
            format!("Linux Wi-Fi capturing from interface '{parent}'")
        };

        let resp = OpenResponse {
            success: true,
            msg,
            uuid,
            capture_interface: prepared.capture_ifname.clone(),
            dlt: prepared.datalink,
            channels: prepared.channels,
        };

        self.interface = Some(parent);
        self.capture_ifname = Some(prepared.capture_ifname);
        self.capture_ifindex = prepared.capture_ifindex;
        self.datalink = prepared.datalink;
        self.restore_nm_on_exit = prepared.restore_nm_on_exit;
        self.pending_capture = Some(prepared.capture);
        self.control = Some(control);

        Ok(resp)
    }

    fn translate_channel(
        &self,
        chanstr: &str,
    ) -> Result<(ChannelDescriptor, Vec<String>), String> {
        ChannelDescriptor::parse(chanstr).map_err(|e| e.to_string())
    }

    async fn set_channel(
        &mut self,
        fw: &FrameworkHandle,
        channel: &ChannelDescriptor,
        seqno: u32,
    ) -> ChannelSetOutcome {
        let (Some(control), Some(capture_ifname)) =
            (&self.control, &self.capture_ifname)
        else {
            // Nothing open yet; nothing to tune.
            return ChannelSetOutcome::Continue;
        };

        match chancontrol::tune(
            control,
            capture_ifname,
            self.capture_ifindex,
            channel,
        )
        .await
        {
            Ok(()) => {
                self.policy.success();
                if seqno != 0 {
                    let resp = ConfigureResponse {
                        success: true,
                        msg: String::new(),
                        channel: channel.to_string(),
                    };
                    if let Ok(frame) =
                        Frame::control(FrameKind::ConfigureResp, seqno, &resp)
                    {
                        fw.send_frame(frame).await;
                    }
                }
                ChannelSetOutcome::Continue
            }
            Err(errstr) => match self.policy.failure(seqno) {
                TuneVerdict::Tolerate => {
                    fw.send_message(
                        MessageLevel::Error,
                        format!(
                            "Could not set channel {channel}; ignoring \
                             error and continuing ({errstr})"
                        ),
                    )
                    .await;
                    ChannelSetOutcome::Continue
                }
                TuneVerdict::Fatal => ChannelSetOutcome::Fatal(format!(
                    "failed to set channel {channel}: {errstr}"
                )),
            },
        }
    }

    fn start_capture(
        &mut self,
        fw: FrameworkHandle,
    ) -> Result<std::thread::JoinHandle<()>, String> {
        let capture = self
            .pending_capture
            .take()
            .ok_or_else(|| "no capture handle to start from".to_string())?;
        let capture_ifname = self
            .capture_ifname
            .clone()
            .ok_or_else(|| "no capture interface".to_string())?;
        capture::spawn(capture, capture_ifname, self.datalink, fw)
            .map_err(|e| e.to_string())
    }
}
