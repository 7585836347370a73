// SPDX-License-Identifier: MIT

const NL80211_CHAN_WIDTH_20_NOHT: u32 = 0;
const NL80211_CHAN_WIDTH_20: u32 = 1;
const NL80211_CHAN_WIDTH_40: u32 = 2;
const NL80211_CHAN_WIDTH_80: u32 = 3;
const NL80211_CHAN_WIDTH_80P80: u32 = 4;
const NL80211_CHAN_WIDTH_160: u32 = 5;
const NL80211_CHAN_WIDTH_5: u32 = 6;
const NL80211_CHAN_WIDTH_10: u32 = 7;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Nl80211ChannelWidth {
    NoHt20,
    Mhz80Plus80,
    Mhz(u32),
    Other(u32),
}

impl From<u32> for Nl80211ChannelWidth {
    fn from(d: u32) -> Self {
        match d {
            NL80211_CHAN_WIDTH_20_NOHT => Self::NoHt20,
            NL80211_CHAN_WIDTH_20 => Self::Mhz(20),
            NL80211_CHAN_WIDTH_40 => Self::Mhz(40),
            NL80211_CHAN_WIDTH_80 => Self::Mhz(80),
            NL80211_CHAN_WIDTH_80P80 => Self::Mhz80Plus80,
            NL80211_CHAN_WIDTH_160 => Self::Mhz(160),
            NL80211_CHAN_WIDTH_5 => Self::Mhz(5),
            NL80211_CHAN_WIDTH_10 => Self::Mhz(10),
            _ => Self::Other(d),
        }
    }
}

impl From<Nl80211ChannelWidth> for u32 {
    fn from(v: Nl80211ChannelWidth) -> u32 {
        match v {
            Nl80211ChannelWidth::NoHt20 => NL80211_CHAN_WIDTH_20_NOHT,
            Nl80211ChannelWidth::Mhz(20) => NL80211_CHAN_WIDTH_20,
            Nl80211ChannelWidth::Mhz(40) => NL80211_CHAN_WIDTH_40,
            Nl80211ChannelWidth::Mhz(80) => NL80211_CHAN_WIDTH_80,
            Nl80211ChannelWidth::Mhz80Plus80 => NL80211_CHAN_WIDTH_80P80,
            Nl80211ChannelWidth::Mhz(160) => NL80211_CHAN_WIDTH_160,
            Nl80211ChannelWidth::Mhz(5) => NL80211_CHAN_WIDTH_5,
            Nl80211ChannelWidth::Mhz(10) => NL80211_CHAN_WIDTH_10,
            Nl80211ChannelWidth::Mhz(_) => {
                log::warn!("Invalid Nl80211ChannelWidth {v:?}");
                u32::MAX
            }
            Nl80211ChannelWidth::Other(d) => d,
        }
    }
}

const NL80211_CHAN_NO_HT: u32 = 0;
const NL80211_CHAN_HT20: u32 = 1;
const NL80211_CHAN_HT40MINUS: u32 = 2;
const NL80211_CHAN_HT40PLUS: u32 = 3;

/// Legacy channel type used by `NL80211_ATTR_WIPHY_CHANNEL_TYPE`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Nl80211HtChannelType {
    NoHt,
    Ht20,
    Ht40Minus,
    Ht40Plus,
    Other(u32),
}

impl From<u32> for Nl80211HtChannelType {
    fn from(d: u32) -> Self {
        match d {
            NL80211_CHAN_NO_HT => Self::NoHt,
            NL80211_CHAN_HT20 => Self::Ht20,
            NL80211_CHAN_HT40MINUS => Self::Ht40Minus,
            NL80211_CHAN_HT40PLUS => Self::Ht40Plus,
            _ => Self::Other(d),
        }
    }
}

impl From<Nl80211HtChannelType> for u32 {
    fn from(v: Nl80211HtChannelType) -> u32 {
        match v {
            Nl80211HtChannelType::NoHt => NL80211_CHAN_NO_HT,
            Nl80211HtChannelType::Ht20 => NL80211_CHAN_HT20,
            Nl80211HtChannelType::Ht40Minus => NL80211_CHAN_HT40MINUS,
            Nl80211HtChannelType::Ht40Plus => NL80211_CHAN_HT40PLUS,
            Nl80211HtChannelType::Other(d) => d,
        }
    }
}
