// SPDX-License-Identifier: MIT

use netlink_packet_utils::{nla::NlasIterator, DecodeError, Emitable};

use crate::bytes::write_u16;

const NL80211_MNTR_FLAG_FCSFAIL: u16 = 1;
const NL80211_MNTR_FLAG_PLCPFAIL: u16 = 2;
const NL80211_MNTR_FLAG_CONTROL: u16 = 3;
const NL80211_MNTR_FLAG_OTHER_BSS: u16 = 4;
const NL80211_MNTR_FLAG_COOK_FRAMES: u16 = 5;
const NL80211_MNTR_FLAG_ACTIVE: u16 = 6;

bitflags::bitflags! {
    /// Monitor mode configuration flags, sent as a nest of empty attributes
    /// inside `NL80211_ATTR_MNTR_FLAGS`.
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    #[non_exhaustive]
    pub struct Nl80211MonitorFlags: u32 {
        /// Pass frames with a bad FCS up the stack.
        const FcsFail = 1 << NL80211_MNTR_FLAG_FCSFAIL;
        /// Pass frames with a bad PLCP up the stack.
        const PlcpFail = 1 << NL80211_MNTR_FLAG_PLCPFAIL;
        /// Pass control frames up the stack.
        const Control = 1 << NL80211_MNTR_FLAG_CONTROL;
        /// Show frames from other BSSes.
        const OtherBss = 1 << NL80211_MNTR_FLAG_OTHER_BSS;
        /// Use the cooked (802.11 + prism) format.
        const CookFrames = 1 << NL80211_MNTR_FLAG_COOK_FRAMES;
        /// ACK incoming unicast frames.
        const Active = 1 << NL80211_MNTR_FLAG_ACTIVE;
    }
}

impl Nl80211MonitorFlags {
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut flags = Self::empty();
        for nla in NlasIterator::new(payload) {
            let nla = nla?;
            flags |= Self::from_bits_retain(1 << nla.kind());
        }
        Ok(flags)
    }
}

impl Emitable for Nl80211MonitorFlags {
    fn buffer_len(&self) -> usize {
        4 * self.iter().count()
    }

    fn emit(&self, buffer: &mut [u8]) {
        let mut offset = 0;
        for flag in self.iter() {
            // Each flag is a zero-length attribute: 4-byte header only.
            write_u16(&mut buffer[offset..], 4);
            write_u16(
                &mut buffer[offset + 2..],
                flag.bits().trailing_zeros() as u16,
            );
            offset += 4;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn emit_parse_roundtrip() {
        let flags = Nl80211MonitorFlags::Control
            | Nl80211MonitorFlags::OtherBss
            | Nl80211MonitorFlags::FcsFail;
        let mut buffer = vec![0u8; flags.buffer_len()];
        flags.emit(&mut buffer);
        assert_eq!(buffer.len(), 12);
        assert_eq!(Nl80211MonitorFlags::parse(&buffer).unwrap(), flags);
    }

    #[test]
    fn empty_set_emits_nothing() {
        let flags = Nl80211MonitorFlags::empty();
        assert_eq!(flags.buffer_len(), 0);
    }
}
