// SPDX-License-Identifier: MIT

//! Static table of Wi-Fi channels and their HT40/VHT capabilities.
//!
//! The wider 802.11n/ac channel arrangements are fixed by the standard, not
//! by the driver, so the 40/80/160 MHz placement rules live in a compile-time
//! table: for every control channel, which HT40 side is legal and what the
//! 80 MHz and 160 MHz segment centers are.

bitflags::bitflags! {
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct HtFlags: u32 {
        /// Usable as the control channel of a HT40- pair.
        const HT40_MINUS = 1 << 0;
        /// Usable as the control channel of a HT40+ pair.
        const HT40_PLUS = 1 << 1;
        /// Part of an 80 MHz VHT segment.
        const VHT80 = 1 << 2;
        /// Part of a 160 MHz VHT segment.
        const VHT160 = 1 << 3;
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct HtChannel {
    pub chan: u32,
    pub freq: u32,
    pub flags: HtFlags,
    /// Center of the 80 MHz segment containing this channel, 0 when none.
    pub freq80: u32,
    /// Center of the 160 MHz segment containing this channel, 0 when none.
    pub freq160: u32,
}

const fn ht(chan: u32, freq: u32, flags: HtFlags, freq80: u32, freq160: u32) -> HtChannel {
    HtChannel {
        chan,
        freq,
        flags,
        freq80,
        freq160,
    }
}

const HT40M: HtFlags = HtFlags::HT40_MINUS;
const HT40P: HtFlags = HtFlags::HT40_PLUS;
const HT40PM: HtFlags = HT40P.union(HT40M);
const VHT80: HtFlags = HtFlags::VHT80;
const VHT160: HtFlags = HtFlags::VHT160;

pub static WIFI_HT_CHANNELS: &[HtChannel] = &[
    ht(1, 2412, HT40P, 0, 0),
    ht(2, 2417, HT40P, 0, 0),
    ht(3, 2422, HT40P, 0, 0),
    ht(4, 2427, HT40P, 0, 0),
    ht(5, 2432, HT40PM, 0, 0),
    ht(6, 2437, HT40PM, 0, 0),
    ht(7, 2442, HT40PM, 0, 0),
    ht(8, 2447, HT40PM, 0, 0),
    ht(9, 2452, HT40PM, 0, 0),
    ht(10, 2457, HT40M, 0, 0),
    ht(11, 2462, HT40M, 0, 0),
    ht(12, 2467, HT40M, 0, 0),
    ht(13, 2472, HT40M, 0, 0),
    ht(14, 2484, HtFlags::empty(), 0, 0),
    // UNII-1
    ht(36, 5180, HT40P.union(VHT80).union(VHT160), 5210, 5250),
    ht(40, 5200, HT40M.union(VHT80).union(VHT160), 5210, 5250),
    ht(44, 5220, HT40P.union(VHT80).union(VHT160), 5210, 5250),
    ht(48, 5240, HT40M.union(VHT80).union(VHT160), 5210, 5250),
    // UNII-2a (DFS)
    ht(52, 5260, HT40P.union(VHT80).union(VHT160), 5290, 5250),
    ht(56, 5280, HT40M.union(VHT80).union(VHT160), 5290, 5250),
    ht(60, 5300, HT40P.union(VHT80).union(VHT160), 5290, 5250),
    ht(64, 5320, HT40M.union(VHT80).union(VHT160), 5290, 5250),
    // UNII-2c (DFS)
    ht(100, 5500, HT40P.union(VHT80).union(VHT160), 5530, 5570),
    ht(104, 5520, HT40M.union(VHT80).union(VHT160), 5530, 5570),
    ht(108, 5540, HT40P.union(VHT80).union(VHT160), 5530, 5570),
    ht(112, 5560, HT40M.union(VHT80).union(VHT160), 5530, 5570),
    ht(116, 5580, HT40P.union(VHT80).union(VHT160), 5610, 5570),
    ht(120, 5600, HT40M.union(VHT80).union(VHT160), 5610, 5570),
    ht(124, 5620, HT40P.union(VHT80).union(VHT160), 5610, 5570),
    ht(128, 5640, HT40M.union(VHT80).union(VHT160), 5610, 5570),
    ht(132, 5660, HT40P.union(VHT80), 5690, 0),
    ht(136, 5680, HT40M.union(VHT80), 5690, 0),
    ht(140, 5700, HT40P.union(VHT80), 5690, 0),
    ht(144, 5720, HT40M.union(VHT80), 5690, 0),
    // UNII-3
    ht(149, 5745, HT40P.union(VHT80), 5775, 0),
    ht(153, 5765, HT40M.union(VHT80), 5775, 0),
    ht(157, 5785, HT40P.union(VHT80), 5775, 0),
    ht(161, 5805, HT40M.union(VHT80), 5775, 0),
    ht(165, 5825, HtFlags::empty(), 0, 0),
];

/// Look up a channel by its channel number or its control frequency in MHz.
pub fn lookup_ht_channel(chan_or_freq: u32) -> Option<&'static HtChannel> {
    WIFI_HT_CHANNELS
        .iter()
        .find(|c| c.chan == chan_or_freq || c.freq == chan_or_freq)
}

/// Map a frequency in MHz to its 802.11 channel number.
pub fn channel_from_mhz(mhz: u32) -> Option<u32> {
    match mhz {
        2412..=2472 => Some((mhz - 2407) / 5),
        2484 => Some(14),
        5180..=5905 => Some((mhz - 5000) / 5),
        _ => None,
    }
}

/// Map an 802.11 channel number to its control frequency in MHz.
pub fn mhz_from_channel(chan: u32) -> Option<u32> {
    if let Some(entry) = lookup_ht_channel(chan) {
        return Some(entry.freq);
    }
    match chan {
        1..=13 => Some(2407 + 5 * chan),
        14 => Some(2484),
        32..=177 => Some(5000 + 5 * chan),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_by_channel_and_frequency() {
        let by_chan = lookup_ht_channel(36).unwrap();
        let by_freq = lookup_ht_channel(5180).unwrap();
        assert_eq!(by_chan, by_freq);
        assert_eq!(by_chan.freq80, 5210);
        assert_eq!(by_chan.freq160, 5250);
    }

    #[test]
    fn ht40_sides() {
        assert!(lookup_ht_channel(36)
            .unwrap()
            .flags
            .contains(HtFlags::HT40_PLUS));
        assert!(!lookup_ht_channel(36)
            .unwrap()
            .flags
            .contains(HtFlags::HT40_MINUS));
        assert!(lookup_ht_channel(6).unwrap().flags.contains(HT40PM));
        assert_eq!(lookup_ht_channel(14).unwrap().flags, HtFlags::empty());
    }

    #[test]
    fn vht160_limited_to_lower_unii() {
        assert!(lookup_ht_channel(100)
            .unwrap()
            .flags
            .contains(HtFlags::VHT160));
        assert!(!lookup_ht_channel(149)
            .unwrap()
            .flags
            .contains(HtFlags::VHT160));
        assert_eq!(lookup_ht_channel(100).unwrap().freq160, 5570);
    }

    #[test]
    fn frequency_to_channel() {
        assert_eq!(channel_from_mhz(2412), Some(1));
        assert_eq!(channel_from_mhz(2437), Some(6));
        assert_eq!(channel_from_mhz(2484), Some(14));
        assert_eq!(channel_from_mhz(5180), Some(36));
        assert_eq!(channel_from_mhz(5825), Some(165));
        assert_eq!(channel_from_mhz(58320), None);
    }

    #[test]
    fn channel_to_frequency() {
        assert_eq!(mhz_from_channel(1), Some(2412));
        assert_eq!(mhz_from_channel(6), Some(2437));
        assert_eq!(mhz_from_channel(14), Some(2484));
        assert_eq!(mhz_from_channel(36), Some(5180));
        // Not in the table, derived from the band formula.
        assert_eq!(mhz_from_channel(169), Some(5845));
        assert_eq!(mhz_from_channel(200), None);
    }

    #[test]
    fn unknown_channel() {
        assert!(lookup_ht_channel(15).is_none());
        assert!(lookup_ht_channel(4000).is_none());
    }
}
