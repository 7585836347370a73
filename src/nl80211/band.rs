// SPDX-License-Identifier: MIT

use anyhow::Context;
use netlink_packet_utils::{
    nla::{DefaultNla, Nla, NlaBuffer, NlasIterator},
    parsers::parse_u32,
    DecodeError, Emitable, Parseable,
};

use crate::bytes::write_u32;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Nl80211Band {
    pub kind: Nl80211BandType,
    pub info: Vec<Nl80211BandInfo>,
}

impl Nla for Nl80211Band {
    fn value_len(&self) -> usize {
        self.info.as_slice().buffer_len()
    }

    fn kind(&self) -> u16 {
        self.kind.into()
    }

    fn emit_value(&self, buffer: &mut [u8]) {
        self.info.as_slice().emit(buffer)
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Parseable<NlaBuffer<&'a T>> for Nl80211Band {
    fn parse(buf: &NlaBuffer<&'a T>) -> Result<Self, DecodeError> {
        let band_type = Nl80211BandType::from(buf.kind());
        let payload = buf.value();
        let mut nlas = Vec::new();
        for nla in NlasIterator::new(payload) {
            let err_msg =
                format!("Invalid NL80211_ATTR_WIPHY_BANDS value {nla:?}");
            let nla = &nla.context(err_msg.clone())?;
            nlas.push(Nl80211BandInfo::parse(nla)?);
        }
        Ok(Self {
            kind: band_type,
            info: nlas,
        })
    }
}

impl Nl80211Band {
    /// All frequencies advertised by this band, in driver order.
    pub fn frequencies(&self) -> impl Iterator<Item = &Nl80211Frequency> {
        self.info
            .iter()
            .filter_map(|info| match info {
                Nl80211BandInfo::Freqs(freqs) => Some(freqs.iter()),
                _ => None,
            })
            .flatten()
    }
}

const NL80211_BAND_2GHZ: u16 = 0;
const NL80211_BAND_5GHZ: u16 = 1;
const NL80211_BAND_60GHZ: u16 = 2;
const NL80211_BAND_6GHZ: u16 = 3;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Nl80211BandType {
    Band2GHz,
    Band5GHz,
    Band60GHz,
    Band6GHz,
    Other(u16),
}

impl From<u16> for Nl80211BandType {
    fn from(d: u16) -> Self {
        match d {
            NL80211_BAND_2GHZ => Self::Band2GHz,
            NL80211_BAND_5GHZ => Self::Band5GHz,
            NL80211_BAND_60GHZ => Self::Band60GHz,
            NL80211_BAND_6GHZ => Self::Band6GHz,
            _ => Self::Other(d),
        }
    }
}

impl From<Nl80211BandType> for u16 {
    fn from(v: Nl80211BandType) -> u16 {
        match v {
            Nl80211BandType::Band2GHz => NL80211_BAND_2GHZ,
            Nl80211BandType::Band5GHz => NL80211_BAND_5GHZ,
            Nl80211BandType::Band60GHz => NL80211_BAND_60GHZ,
            Nl80211BandType::Band6GHz => NL80211_BAND_6GHZ,
            Nl80211BandType::Other(d) => d,
        }
    }
}

const NL80211_BAND_ATTR_FREQS: u16 = 1;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Nl80211BandInfo {
    /// Supported frequencies in this band.
    Freqs(Vec<Nl80211Frequency>),
    /// Band attributes this helper has no use for (rates, MCS sets, caps).
    Other(DefaultNla),
}

impl Nla for Nl80211BandInfo {
    fn value_len(&self) -> usize {
        match self {
            Self::Freqs(freqs) => freqs.as_slice().buffer_len(),
            Self::Other(attr) => attr.value_len(),
        }
    }

    fn kind(&self) -> u16 {
        match self {
            Self::Freqs(_) => NL80211_BAND_ATTR_FREQS,
            Self::Other(attr) => attr.kind(),
        }
    }

    fn emit_value(&self, buffer: &mut [u8]) {
        match self {
            Self::Freqs(freqs) => freqs.as_slice().emit(buffer),
            Self::Other(attr) => attr.emit_value(buffer),
        }
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Parseable<NlaBuffer<&'a T>>
    for Nl80211BandInfo
{
    fn parse(buf: &NlaBuffer<&'a T>) -> Result<Self, DecodeError> {
        let payload = buf.value();
        Ok(match buf.kind() {
            NL80211_BAND_ATTR_FREQS => {
                let mut freqs = Vec::new();
                for nla in NlasIterator::new(payload) {
                    let err_msg = format!(
                        "Invalid NL80211_BAND_ATTR_FREQS value {nla:?}"
                    );
                    let nla = &nla.context(err_msg.clone())?;
                    freqs.push(Nl80211Frequency::parse(nla)?);
                }
                Self::Freqs(freqs)
            }
            _ => Self::Other(
                DefaultNla::parse(buf).context("invalid NLA (unknown kind)")?,
            ),
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Nl80211Frequency {
    pub index: u16,
    pub info: Vec<Nl80211FrequencyInfo>,
}

impl Nl80211Frequency {
    pub fn mhz(&self) -> Option<u32> {
        self.info.iter().find_map(|info| match info {
            Nl80211FrequencyInfo::Freq(mhz) => Some(*mhz),
            _ => None,
        })
    }

    pub fn disabled(&self) -> bool {
        self.has(&Nl80211FrequencyInfo::Disabled)
    }

    pub fn ht40_minus(&self) -> bool {
        !self.has(&Nl80211FrequencyInfo::NoHt40Minus)
    }

    pub fn ht40_plus(&self) -> bool {
        !self.has(&Nl80211FrequencyInfo::NoHt40Plus)
    }

    pub fn vht80(&self) -> bool {
        !self.has(&Nl80211FrequencyInfo::No80Mhz)
    }

    pub fn vht160(&self) -> bool {
        !self.has(&Nl80211FrequencyInfo::No160Mhz)
    }

    fn has(&self, what: &Nl80211FrequencyInfo) -> bool {
        self.info.iter().any(|info| info == what)
    }
}

impl Nla for Nl80211Frequency {
    fn value_len(&self) -> usize {
        self.info.as_slice().buffer_len()
    }

    fn kind(&self) -> u16 {
        self.index
    }

    fn emit_value(&self, buffer: &mut [u8]) {
        self.info.as_slice().emit(buffer)
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Parseable<NlaBuffer<&'a T>>
    for Nl80211Frequency
{
    fn parse(buf: &NlaBuffer<&'a T>) -> Result<Self, DecodeError> {
        let index = buf.kind();
        let payload = buf.value();
        let mut nlas = Vec::new();
        for nla in NlasIterator::new(payload) {
            let err_msg =
                format!("Invalid NL80211_BAND_ATTR_FREQS value {nla:?}");
            let nla = &nla.context(err_msg.clone())?;
            nlas.push(Nl80211FrequencyInfo::parse(nla)?);
        }
        Ok(Self { index, info: nlas })
    }
}

const NL80211_FREQUENCY_ATTR_FREQ: u16 = 1;
const NL80211_FREQUENCY_ATTR_DISABLED: u16 = 2;
const NL80211_FREQUENCY_ATTR_NO_IR: u16 = 3;
const NL80211_FREQUENCY_ATTR_RADAR: u16 = 5;
const NL80211_FREQUENCY_ATTR_NO_HT40_MINUS: u16 = 9;
const NL80211_FREQUENCY_ATTR_NO_HT40_PLUS: u16 = 10;
const NL80211_FREQUENCY_ATTR_NO_80MHZ: u16 = 11;
const NL80211_FREQUENCY_ATTR_NO_160MHZ: u16 = 12;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Nl80211FrequencyInfo {
    /// Frequency in MHz
    Freq(u32),
    /// Channel is disabled in current regulatory domain
    Disabled,
    /// No mechanisms that initiate radiation are permitted on this channel
    NoIr,
    /// Radar detection is mandatory on this channel in current regulatory
    /// domain
    Radar,
    /// HT40- isn't possible with this channel as the control channel
    NoHt40Minus,
    /// HT40+ isn't possible with this channel as the control channel
    NoHt40Plus,
    /// No 80 MHz channel may use this channel
    No80Mhz,
    /// No 160 MHz channel may use this channel
    No160Mhz,
    /// Frequency attributes this helper does not interpret
    Other(DefaultNla),
}

impl Nla for Nl80211FrequencyInfo {
    fn value_len(&self) -> usize {
        match self {
            Self::Freq(_) => 4,
            Self::Disabled
            | Self::NoIr
            | Self::Radar
            | Self::NoHt40Minus
            | Self::NoHt40Plus
            | Self::No80Mhz
            | Self::No160Mhz => 0,
            Self::Other(attr) => attr.value_len(),
        }
    }

    fn kind(&self) -> u16 {
        match self {
            Self::Freq(_) => NL80211_FREQUENCY_ATTR_FREQ,
            Self::Disabled => NL80211_FREQUENCY_ATTR_DISABLED,
            Self::NoIr => NL80211_FREQUENCY_ATTR_NO_IR,
            Self::Radar => NL80211_FREQUENCY_ATTR_RADAR,
            Self::NoHt40Minus => NL80211_FREQUENCY_ATTR_NO_HT40_MINUS,
            Self::NoHt40Plus => NL80211_FREQUENCY_ATTR_NO_HT40_PLUS,
            Self::No80Mhz => NL80211_FREQUENCY_ATTR_NO_80MHZ,
            Self::No160Mhz => NL80211_FREQUENCY_ATTR_NO_160MHZ,
            Self::Other(attr) => attr.kind(),
        }
    }

    fn emit_value(&self, buffer: &mut [u8]) {
        match self {
            Self::Freq(d) => write_u32(buffer, *d),
            Self::Disabled
            | Self::NoIr
            | Self::Radar
            | Self::NoHt40Minus
            | Self::NoHt40Plus
            | Self::No80Mhz
            | Self::No160Mhz => (),
            Self::Other(attr) => attr.emit_value(buffer),
        }
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Parseable<NlaBuffer<&'a T>>
    for Nl80211FrequencyInfo
{
    fn parse(buf: &NlaBuffer<&'a T>) -> Result<Self, DecodeError> {
        let payload = buf.value();
        Ok(match buf.kind() {
            NL80211_FREQUENCY_ATTR_FREQ => {
                Self::Freq(parse_u32(payload).context(format!(
                    "Invalid NL80211_FREQUENCY_ATTR_FREQ value: {payload:?}"
                ))?)
            }
            NL80211_FREQUENCY_ATTR_DISABLED => Self::Disabled,
            NL80211_FREQUENCY_ATTR_NO_IR => Self::NoIr,
            NL80211_FREQUENCY_ATTR_RADAR => Self::Radar,
            NL80211_FREQUENCY_ATTR_NO_HT40_MINUS => Self::NoHt40Minus,
            NL80211_FREQUENCY_ATTR_NO_HT40_PLUS => Self::NoHt40Plus,
            NL80211_FREQUENCY_ATTR_NO_80MHZ => Self::No80Mhz,
            NL80211_FREQUENCY_ATTR_NO_160MHZ => Self::No160Mhz,
            _ => Self::Other(
                DefaultNla::parse(buf).context("invalid NLA (unknown kind)")?,
            ),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn freq(mhz: u32, restrictions: &[Nl80211FrequencyInfo]) -> Nl80211Frequency {
        let mut info = vec![Nl80211FrequencyInfo::Freq(mhz)];
        info.extend_from_slice(restrictions);
        Nl80211Frequency { index: 0, info }
    }

    #[test]
    fn frequency_capabilities() {
        let f = freq(5180, &[Nl80211FrequencyInfo::NoHt40Minus]);
        assert_eq!(f.mhz(), Some(5180));
        assert!(!f.disabled());
        assert!(!f.ht40_minus());
        assert!(f.ht40_plus());
        assert!(f.vht80());
    }

    #[test]
    fn frequency_nest_roundtrip() {
        let f = freq(
            2412,
            &[
                Nl80211FrequencyInfo::NoHt40Minus,
                Nl80211FrequencyInfo::No80Mhz,
                Nl80211FrequencyInfo::No160Mhz,
            ],
        );
        let mut buffer = vec![0u8; f.buffer_len()];
        f.emit(&mut buffer);
        let parsed =
            Nl80211Frequency::parse(&NlaBuffer::new_checked(&buffer).unwrap())
                .unwrap();
        assert_eq!(parsed, f);
    }
}
