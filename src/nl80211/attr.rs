// SPDX-License-Identifier: MIT

use anyhow::Context;
use netlink_packet_utils::{
    nla::{DefaultNla, Nla, NlaBuffer, NlasIterator},
    parsers::{parse_string, parse_u32},
    DecodeError, Emitable, Parseable,
};

use crate::bytes::write_u32;

use super::{
    Nl80211Band, Nl80211ChannelWidth, Nl80211HtChannelType,
    Nl80211InterfaceType, Nl80211MonitorFlags,
};

const ETH_ALEN: usize = 6;

const NL80211_ATTR_WIPHY: u16 = 1;
const NL80211_ATTR_IFINDEX: u16 = 3;
const NL80211_ATTR_IFNAME: u16 = 4;
const NL80211_ATTR_IFTYPE: u16 = 5;
const NL80211_ATTR_MAC: u16 = 6;
const NL80211_ATTR_WIPHY_BANDS: u16 = 22;
const NL80211_ATTR_MNTR_FLAGS: u16 = 23;
const NL80211_ATTR_WIPHY_FREQ: u16 = 38;
const NL80211_ATTR_WIPHY_CHANNEL_TYPE: u16 = 39;
const NL80211_ATTR_GENERATION: u16 = 46;
const NL80211_ATTR_CHANNEL_WIDTH: u16 = 159;
const NL80211_ATTR_CENTER_FREQ1: u16 = 160;
const NL80211_ATTR_CENTER_FREQ2: u16 = 161;
const NL80211_ATTR_SPLIT_WIPHY_DUMP: u16 = 174;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Nl80211Attr {
    Wiphy(u32),
    IfIndex(u32),
    IfName(String),
    IfType(Nl80211InterfaceType),
    Mac([u8; ETH_ALEN]),
    WiphyBands(Vec<Nl80211Band>),
    MntrFlags(Nl80211MonitorFlags),
    WiphyFreq(u32),
    WiphyChannelType(Nl80211HtChannelType),
    Generation(u32),
    ChannelWidth(Nl80211ChannelWidth),
    CenterFreq1(u32),
    CenterFreq2(u32),
    SplitWiphyDump,
    Other(DefaultNla),
}

impl Nla for Nl80211Attr {
    fn value_len(&self) -> usize {
        match self {
            Self::Wiphy(_)
            | Self::IfIndex(_)
            | Self::IfType(_)
            | Self::WiphyFreq(_)
            | Self::WiphyChannelType(_)
            | Self::Generation(_)
            | Self::ChannelWidth(_)
            | Self::CenterFreq1(_)
            | Self::CenterFreq2(_) => 4,
            Self::IfName(s) => s.len() + 1,
            Self::Mac(_) => ETH_ALEN,
            Self::WiphyBands(bands) => bands.as_slice().buffer_len(),
            Self::MntrFlags(flags) => flags.buffer_len(),
            Self::SplitWiphyDump => 0,
            Self::Other(attr) => attr.value_len(),
        }
    }

    fn kind(&self) -> u16 {
        match self {
            Self::Wiphy(_) => NL80211_ATTR_WIPHY,
            Self::IfIndex(_) => NL80211_ATTR_IFINDEX,
            Self::IfName(_) => NL80211_ATTR_IFNAME,
            Self::IfType(_) => NL80211_ATTR_IFTYPE,
            Self::Mac(_) => NL80211_ATTR_MAC,
            Self::WiphyBands(_) => NL80211_ATTR_WIPHY_BANDS,
            Self::MntrFlags(_) => NL80211_ATTR_MNTR_FLAGS,
            Self::WiphyFreq(_) => NL80211_ATTR_WIPHY_FREQ,
            Self::WiphyChannelType(_) => NL80211_ATTR_WIPHY_CHANNEL_TYPE,
            Self::Generation(_) => NL80211_ATTR_GENERATION,
            Self::ChannelWidth(_) => NL80211_ATTR_CHANNEL_WIDTH,
            Self::CenterFreq1(_) => NL80211_ATTR_CENTER_FREQ1,
            Self::CenterFreq2(_) => NL80211_ATTR_CENTER_FREQ2,
            Self::SplitWiphyDump => NL80211_ATTR_SPLIT_WIPHY_DUMP,
            Self::Other(attr) => attr.kind(),
        }
    }

    fn emit_value(&self, buffer: &mut [u8]) {
        match self {
            Self::Wiphy(d)
            | Self::IfIndex(d)
            | Self::WiphyFreq(d)
            | Self::Generation(d)
            | Self::CenterFreq1(d)
            | Self::CenterFreq2(d) => write_u32(buffer, *d),
            Self::IfType(t) => write_u32(buffer, u32::from(*t)),
            Self::WiphyChannelType(t) => write_u32(buffer, u32::from(*t)),
            Self::ChannelWidth(w) => write_u32(buffer, u32::from(*w)),
            Self::IfName(s) => {
                buffer[..s.len()].copy_from_slice(s.as_bytes());
                buffer[s.len()] = 0;
            }
            Self::Mac(mac) => buffer.copy_from_slice(mac),
            Self::WiphyBands(bands) => bands.as_slice().emit(buffer),
            Self::MntrFlags(flags) => flags.emit(buffer),
            Self::SplitWiphyDump => (),
            Self::Other(attr) => attr.emit_value(buffer),
        }
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Parseable<NlaBuffer<&'a T>> for Nl80211Attr {
    fn parse(buf: &NlaBuffer<&'a T>) -> Result<Self, DecodeError> {
        let payload = buf.value();
        Ok(match buf.kind() {
            NL80211_ATTR_WIPHY => Self::Wiphy(
                parse_u32(payload)
                    .context(format!("Invalid NL80211_ATTR_WIPHY {payload:?}"))?,
            ),
            NL80211_ATTR_IFINDEX => Self::IfIndex(
                parse_u32(payload).context(format!(
                    "Invalid NL80211_ATTR_IFINDEX {payload:?}"
                ))?,
            ),
            NL80211_ATTR_IFNAME => Self::IfName(
                parse_string(payload).context(format!(
                    "Invalid NL80211_ATTR_IFNAME {payload:?}"
                ))?,
            ),
            NL80211_ATTR_IFTYPE => Self::IfType(
                Nl80211InterfaceType::parse(payload).context(format!(
                    "Invalid NL80211_ATTR_IFTYPE {payload:?}"
                ))?,
            ),
            NL80211_ATTR_MAC => {
                let mut mac = [0u8; ETH_ALEN];
                if payload.len() < ETH_ALEN {
                    return Err(DecodeError::from(format!(
                        "Invalid NL80211_ATTR_MAC {payload:?}"
                    )));
                }
                mac.copy_from_slice(&payload[..ETH_ALEN]);
                Self::Mac(mac)
            }
            NL80211_ATTR_WIPHY_BANDS => {
                let mut bands = Vec::new();
                for nla in NlasIterator::new(payload) {
                    let err_msg = format!(
                        "Invalid NL80211_ATTR_WIPHY_BANDS value {nla:?}"
                    );
                    let nla = &nla.context(err_msg.clone())?;
                    bands.push(Nl80211Band::parse(nla).context(err_msg)?);
                }
                Self::WiphyBands(bands)
            }
            NL80211_ATTR_MNTR_FLAGS => Self::MntrFlags(
                Nl80211MonitorFlags::parse(payload).context(format!(
                    "Invalid NL80211_ATTR_MNTR_FLAGS {payload:?}"
                ))?,
            ),
            NL80211_ATTR_WIPHY_FREQ => Self::WiphyFreq(
                parse_u32(payload).context(format!(
                    "Invalid NL80211_ATTR_WIPHY_FREQ {payload:?}"
                ))?,
            ),
            NL80211_ATTR_WIPHY_CHANNEL_TYPE => Self::WiphyChannelType(
                parse_u32(payload)
                    .context(format!(
                        "Invalid NL80211_ATTR_WIPHY_CHANNEL_TYPE {payload:?}"
                    ))?
                    .into(),
            ),
            NL80211_ATTR_GENERATION => Self::Generation(
                parse_u32(payload).context(format!(
                    "Invalid NL80211_ATTR_GENERATION {payload:?}"
                ))?,
            ),
            NL80211_ATTR_CHANNEL_WIDTH => Self::ChannelWidth(
                parse_u32(payload)
                    .context(format!(
                        "Invalid NL80211_ATTR_CHANNEL_WIDTH {payload:?}"
                    ))?
                    .into(),
            ),
            NL80211_ATTR_CENTER_FREQ1 => Self::CenterFreq1(
                parse_u32(payload).context(format!(
                    "Invalid NL80211_ATTR_CENTER_FREQ1 {payload:?}"
                ))?,
            ),
            NL80211_ATTR_CENTER_FREQ2 => Self::CenterFreq2(
                parse_u32(payload).context(format!(
                    "Invalid NL80211_ATTR_CENTER_FREQ2 {payload:?}"
                ))?,
            ),
            NL80211_ATTR_SPLIT_WIPHY_DUMP => Self::SplitWiphyDump,
            _ => Self::Other(
                DefaultNla::parse(buf).context("invalid NLA (unknown kind)")?,
            ),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn emit(attr: &Nl80211Attr) -> Vec<u8> {
        let mut buffer = vec![0u8; attr.buffer_len()];
        attr.emit(&mut buffer);
        buffer
    }

    #[test]
    fn ifname_roundtrip() {
        let attr = Nl80211Attr::IfName("wlan0mon".to_string());
        let buffer = emit(&attr);
        let parsed =
            Nl80211Attr::parse(&NlaBuffer::new_checked(&buffer).unwrap())
                .unwrap();
        assert_eq!(parsed, attr);
    }

    #[test]
    fn u32_attrs_roundtrip() {
        for attr in [
            Nl80211Attr::Wiphy(2),
            Nl80211Attr::IfIndex(7),
            Nl80211Attr::WiphyFreq(5180),
            Nl80211Attr::CenterFreq1(5210),
            Nl80211Attr::IfType(Nl80211InterfaceType::Monitor),
        ] {
            let buffer = emit(&attr);
            let parsed =
                Nl80211Attr::parse(&NlaBuffer::new_checked(&buffer).unwrap())
                    .unwrap();
            assert_eq!(parsed, attr);
        }
    }

    #[test]
    fn split_wiphy_dump_is_flag_only() {
        let attr = Nl80211Attr::SplitWiphyDump;
        assert_eq!(attr.value_len(), 0);
        assert_eq!(emit(&attr).len(), 4);
    }
}
