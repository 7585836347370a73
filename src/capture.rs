// SPDX-License-Identifier: MIT

//! The capture worker.
//!
//! One OS thread sits in a blocking pcap read and forwards every packet to
//! the parent. The read timeout doubles as the cancellation point: each
//! time it fires the worker checks the shutdown flag. Packets are never
//! dropped; a full ring parks the worker until the writer drains.

use std::io;

use log::debug;

use crate::framework::proto::Frame;
use crate::framework::{FrameworkHandle, SendOutcome};
use crate::netif;

pub fn spawn(
    capture: pcap::Capture<pcap::Active>,
    capture_ifname: String,
    datalink: i32,
    fw: FrameworkHandle,
) -> io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || run(capture, capture_ifname, datalink, fw))
}

fn run(
    mut capture: pcap::Capture<pcap::Active>,
    capture_ifname: String,
    datalink: i32,
    fw: FrameworkHandle,
) {
    debug!("capture loop starting on '{capture_ifname}'");

    let mut failure: Option<String> = None;
    loop {
        if fw.is_shutting_down() {
            break;
        }

        let frame = match capture.next_packet() {
            Ok(packet) => Frame::data(
                packet.header.ts.tv_sec as u64,
                packet.header.ts.tv_usec as u32,
                datalink as u32,
                packet.data,
            ),
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => {
                failure = Some(e.to_string());
                break;
            }
        };

        match fw.try_send_data(frame) {
            SendOutcome::Sent => {}
            SendOutcome::BufferFull(frame) => {
                // The parent hasn't drained the ring yet; park until it
                // does and deliver the same packet.
                if fw.wait_ring(frame).is_err() {
                    failure = Some("unable to send DATA frame".to_string());
                    break;
                }
            }
            SendOutcome::Failed => {
                failure = Some("unable to send DATA frame".to_string());
                break;
            }
        }
    }

    if let Some(reason) = failure {
        fw.blocking_error(format!(
            "Interface '{capture_ifname}' closed: {reason}"
        ));
    }

    // However the loop ended, check whether the interface is still there;
    // losing it mid-capture has a better explanation than a bare read error.
    let still_up = netif::is_up(&capture_ifname).unwrap_or(false);
    if !still_up {
        fw.blocking_error(format!(
            "Interface '{capture_ifname}' no longer appears to be up; \
             this can happen when it is unplugged, or when another \
             service like DHCP or NetworkManager has taken over and \
             shut it down."
        ));
    }

    fw.spindown();
    debug!("capture loop on '{capture_ifname}' finished");
}
