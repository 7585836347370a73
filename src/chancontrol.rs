// SPDX-License-Identifier: MIT

//! Channel setting and the hop-tolerant failure policy.
//!
//! Tuning fails transiently on plenty of Linux drivers, so failures inside
//! the hop loop are tolerated up to a limit and only an unbroken run of
//! them is fatal. An explicit configure command from the parent is held to
//! a stricter standard: the user asked for that exact channel, so any
//! failure is reported as terminal.

use crate::channel::{ChannelDescriptor, ChannelType, ChannelWidth};
use crate::control::ControlPlane;
use crate::ht_table::mhz_from_channel;
use crate::nl80211::{Nl80211ChannelWidth, Nl80211HtChannelType};
use crate::wext;

/// Consecutive hop-context failures tolerated before giving up.
pub const MAX_SEQ_CHANNEL_FAILURES: u32 = 10;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TuneVerdict {
    /// Log and keep hopping.
    Tolerate,
    /// Surface a terminal error and unwind.
    Fatal,
}

/// Counts consecutive channel-set failures. Reset by any success.
#[derive(Debug, Default)]
pub struct FailurePolicy {
    consecutive: u32,
}

impl FailurePolicy {
    pub fn success(&mut self) {
        self.consecutive = 0;
    }

    pub fn failure(&mut self, seqno: u32) -> TuneVerdict {
        if seqno != 0 {
            return TuneVerdict::Fatal;
        }
        self.consecutive += 1;
        if self.consecutive >= MAX_SEQ_CHANNEL_FAILURES {
            TuneVerdict::Fatal
        } else {
            TuneVerdict::Tolerate
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// Apply a channel descriptor to the capture interface.
pub async fn tune(
    control: &ControlPlane,
    capture_ifname: &str,
    capture_ifindex: u32,
    chan: &ChannelDescriptor,
) -> Result<(), String> {
    if !control.use_netlink() {
        // Legacy drivers only understand a plain frequency; type and width
        // cannot be expressed.
        return wext::set_channel(capture_ifname, chan.control_freq)
            .map_err(|e| e.to_string());
    }

    let session = control
        .session()
        .ok_or_else(|| "netlink session is gone".to_string())?;
    let control_freq = as_mhz(chan.control_freq);

    match chan.chan_width {
        ChannelWidth::Default => {
            let chan_type = match chan.chan_type {
                ChannelType::None => Nl80211HtChannelType::NoHt,
                ChannelType::Ht40Minus => Nl80211HtChannelType::Ht40Minus,
                ChannelType::Ht40Plus => Nl80211HtChannelType::Ht40Plus,
            };
            session
                .set_channel(capture_ifindex, control_freq, chan_type)
                .await
                .map_err(|e| e.to_string())
        }
        width => {
            let width = match width {
                ChannelWidth::Mhz5 => Nl80211ChannelWidth::Mhz(5),
                ChannelWidth::Mhz10 => Nl80211ChannelWidth::Mhz(10),
                ChannelWidth::Mhz80 => Nl80211ChannelWidth::Mhz(80),
                ChannelWidth::Mhz160 => Nl80211ChannelWidth::Mhz(160),
                ChannelWidth::Default => unreachable!(),
            };
            session
                .set_frequency(
                    capture_ifindex,
                    control_freq,
                    width,
                    chan.center_freq1,
                    chan.center_freq2,
                )
                .await
                .map_err(|e| e.to_string())
        }
    }
}

/// The grammar keeps whatever number the user supplied; nl80211 wants MHz.
fn as_mhz(chan_or_freq: u32) -> u32 {
    if chan_or_freq < 1000 {
        mhz_from_channel(chan_or_freq).unwrap_or(chan_or_freq)
    } else {
        chan_or_freq
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hop_failures_tolerated_until_limit() {
        let mut policy = FailurePolicy::default();
        for i in 1..MAX_SEQ_CHANNEL_FAILURES {
            assert_eq!(policy.failure(0), TuneVerdict::Tolerate, "failure {i}");
        }
        assert_eq!(policy.failure(0), TuneVerdict::Fatal);
    }

    #[test]
    fn success_resets_the_counter() {
        let mut policy = FailurePolicy::default();
        for _ in 0..(MAX_SEQ_CHANNEL_FAILURES - 1) {
            policy.failure(0);
        }
        policy.success();
        assert_eq!(policy.consecutive(), 0);
        assert_eq!(policy.failure(0), TuneVerdict::Tolerate);
    }

    #[test]
    fn explicit_configure_failure_is_always_fatal() {
        let mut policy = FailurePolicy::default();
        assert_eq!(policy.failure(17), TuneVerdict::Fatal);
        // An explicit failure does not disturb the hop counter.
        assert_eq!(policy.consecutive(), 0);
    }

    #[test]
    fn channel_numbers_become_frequencies() {
        assert_eq!(as_mhz(6), 2437);
        assert_eq!(as_mhz(36), 5180);
        assert_eq!(as_mhz(5180), 5180);
        assert_eq!(as_mhz(100), 5500);
    }
}
