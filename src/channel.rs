// SPDX-License-Identifier: MIT

//! The channel grammar.
//!
//! Channel strings name a control channel or frequency plus an optional
//! width modifier:
//!
//! * `NN` — standard 20 MHz channel
//! * `NNHT40+` / `NNHT40-` — 40 MHz 802.11n pair, secondary above/below
//! * `NNW5` / `NNW10` — narrow 5/10 MHz channel
//! * `NNVHT80` / `NNVHT160` — 80/160 MHz 802.11ac channel, segment center
//!   taken from the channel table
//! * `NNVHT80-CC` / `NNVHT160-CC` — as above with an explicit segment center
//!
//! Parsing happens once per configured channel; the hop loop only ever sees
//! the parsed [`ChannelDescriptor`].

use std::fmt;

use thiserror::Error;

use crate::ht_table::{lookup_ht_channel, HtFlags};

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum ChannelType {
    #[default]
    None,
    Ht40Minus,
    Ht40Plus,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum ChannelWidth {
    #[default]
    Default,
    Mhz5,
    Mhz10,
    Mhz80,
    Mhz160,
}

/// Parsed form of a channel string.
///
/// `chan_type` is only ever set for HT40 channels, in which case the width
/// stays `Default` and both centers are zero. The VHT widths always carry a
/// nonzero `center_freq1`; the narrow widths carry none.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct ChannelDescriptor {
    /// Control channel or frequency exactly as supplied.
    pub control_freq: u32,
    pub chan_type: ChannelType,
    pub chan_width: ChannelWidth,
    pub center_freq1: u32,
    pub center_freq2: u32,
    /// The 80/160 MHz center was supplied explicitly rather than derived
    /// from the channel table. Only affects serialization.
    pub unusual_center1: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelParseError {
    #[error("unable to parse any channel information from channel string '{0}'")]
    NoChannel(String),
    #[error(
        "requested channel {chan} as a VHT{width} channel; this does not \
         appear to be a valid channel for {width}MHz operation, skipping channel"
    )]
    InvalidVht { chan: u32, width: u32 },
}

impl ChannelDescriptor {
    /// Parse a channel string.
    ///
    /// Returns the descriptor plus any informational notes the caller should
    /// surface (unknown modifiers, HT40 pairs the channel table does not
    /// list). Strings without a leading channel number and VHT requests the
    /// table cannot satisfy fail outright.
    pub fn parse(chanstr: &str) -> Result<(Self, Vec<String>), ChannelParseError> {
        let s = chanstr.trim();
        let digits = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let num: u32 = s[..digits]
            .parse()
            .map_err(|_| ChannelParseError::NoChannel(s.to_string()))?;

        let mut desc = ChannelDescriptor {
            control_freq: num,
            ..Default::default()
        };
        let mut notes = Vec::new();
        let rest = &s[digits..];

        if rest.is_empty() {
            return Ok((desc, notes));
        }

        // HT40+ / HT40-
        if rest.len() == 5 && rest[..4].eq_ignore_ascii_case("ht40") {
            match &rest[4..] {
                "-" => {
                    desc.chan_type = ChannelType::Ht40Minus;
                    if !table_allows(num, HtFlags::HT40_MINUS) {
                        notes.push(format!(
                            "requested channel {num} as a HT40- channel; this does not \
                             appear to be a valid channel for 40MHz operation."
                        ));
                    }
                    return Ok((desc, notes));
                }
                "+" => {
                    desc.chan_type = ChannelType::Ht40Plus;
                    if !table_allows(num, HtFlags::HT40_PLUS) {
                        notes.push(format!(
                            "requested channel {num} as a HT40+ channel; this does not \
                             appear to be a valid channel for 40MHz operation."
                        ));
                    }
                    return Ok((desc, notes));
                }
                _ => {}
            }
        }

        // Width modifiers, with an optional explicit center after a dash.
        let (suffix, center) = match rest.split_once('-') {
            Some((suffix, center)) => (suffix, center.parse::<u32>().ok()),
            None => (rest, None),
        };

        if suffix.eq_ignore_ascii_case("w5") {
            desc.chan_width = ChannelWidth::Mhz5;
        } else if suffix.eq_ignore_ascii_case("w10") {
            desc.chan_width = ChannelWidth::Mhz10;
        } else if suffix.eq_ignore_ascii_case("vht80") {
            desc.chan_width = ChannelWidth::Mhz80;
            resolve_vht_center(&mut desc, num, center, 80)?;
        } else if suffix.eq_ignore_ascii_case("vht160") {
            desc.chan_width = ChannelWidth::Mhz160;
            resolve_vht_center(&mut desc, num, center, 160)?;
        } else {
            notes.push(format!(
                "unable to parse attributes on channel '{s}', treating as \
                 standard non-HT channel."
            ));
        }

        Ok((desc, notes))
    }
}

fn table_allows(chan_or_freq: u32, flag: HtFlags) -> bool {
    lookup_ht_channel(chan_or_freq).is_some_and(|c| c.flags.contains(flag))
}

fn resolve_vht_center(
    desc: &mut ChannelDescriptor,
    num: u32,
    explicit: Option<u32>,
    width: u32,
) -> Result<(), ChannelParseError> {
    if let Some(center) = explicit {
        desc.center_freq1 = center;
        desc.unusual_center1 = true;
        return Ok(());
    }

    let flag = if width == 80 {
        HtFlags::VHT80
    } else {
        HtFlags::VHT160
    };
    match lookup_ht_channel(num) {
        Some(entry) if entry.flags.contains(flag) => {
            desc.control_freq = entry.freq;
            desc.center_freq1 = if width == 80 {
                entry.freq80
            } else {
                entry.freq160
            };
            Ok(())
        }
        _ => Err(ChannelParseError::InvalidVht { chan: num, width }),
    }
}

impl fmt::Display for ChannelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chan_type {
            ChannelType::Ht40Minus => return write!(f, "{}HT40-", self.control_freq),
            ChannelType::Ht40Plus => return write!(f, "{}HT40+", self.control_freq),
            ChannelType::None => {}
        }
        match self.chan_width {
            ChannelWidth::Mhz5 => write!(f, "{}W5", self.control_freq),
            ChannelWidth::Mhz10 => write!(f, "{}W10", self.control_freq),
            ChannelWidth::Mhz80 if self.unusual_center1 => {
                write!(f, "{}VHT80-{}", self.control_freq, self.center_freq1)
            }
            ChannelWidth::Mhz80 => write!(f, "{}VHT80", self.control_freq),
            ChannelWidth::Mhz160 if self.unusual_center1 => {
                write!(f, "{}VHT160-{}", self.control_freq, self.center_freq1)
            }
            ChannelWidth::Mhz160 => write!(f, "{}VHT160", self.control_freq),
            ChannelWidth::Default => write!(f, "{}", self.control_freq),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_ok(s: &str) -> (ChannelDescriptor, Vec<String>) {
        ChannelDescriptor::parse(s).unwrap()
    }

    fn roundtrip(d: ChannelDescriptor) {
        let (again, _) = parse_ok(&d.to_string());
        assert_eq!(again, d, "round-trip of '{d}'");
    }

    #[test]
    fn bare_channel() {
        let (d, notes) = parse_ok("6");
        assert_eq!(d.control_freq, 6);
        assert_eq!(d.chan_type, ChannelType::None);
        assert_eq!(d.chan_width, ChannelWidth::Default);
        assert!(notes.is_empty());
        assert_eq!(d.to_string(), "6");
        roundtrip(d);
    }

    #[test]
    fn ht40_plus_valid() {
        let (d, notes) = parse_ok("36HT40+");
        assert_eq!(d.control_freq, 36);
        assert_eq!(d.chan_type, ChannelType::Ht40Plus);
        assert!(notes.is_empty(), "36 supports HT40+, no note expected");
        assert_eq!(d.to_string(), "36HT40+");
        roundtrip(d);
    }

    #[test]
    fn ht40_minus_with_note() {
        // 36 only pairs upward; the descriptor still comes back.
        let (d, notes) = parse_ok("36HT40-");
        assert_eq!(d.chan_type, ChannelType::Ht40Minus);
        assert_eq!(notes.len(), 1);
        roundtrip(d);
    }

    #[test]
    fn ht40_case_insensitive() {
        let (d, _) = parse_ok("6ht40+");
        assert_eq!(d.chan_type, ChannelType::Ht40Plus);
    }

    #[test]
    fn narrow_widths() {
        let (d, notes) = parse_ok("6W5");
        assert_eq!(d.chan_width, ChannelWidth::Mhz5);
        assert!(notes.is_empty());
        roundtrip(d);

        let (d, _) = parse_ok("6w10");
        assert_eq!(d.chan_width, ChannelWidth::Mhz10);
        assert_eq!(d.center_freq1, 0);
        roundtrip(d);
    }

    #[test]
    fn vht80_from_table() {
        let (d, notes) = parse_ok("36VHT80");
        assert_eq!(d.control_freq, 5180);
        assert_eq!(d.chan_width, ChannelWidth::Mhz80);
        assert_eq!(d.center_freq1, 5210);
        assert!(!d.unusual_center1);
        assert!(notes.is_empty());
        roundtrip(d);
    }

    #[test]
    fn vht160_explicit_center() {
        let (d, notes) = parse_ok("100VHT160-5250");
        assert_eq!(d.control_freq, 100);
        assert_eq!(d.chan_width, ChannelWidth::Mhz160);
        assert_eq!(d.center_freq1, 5250);
        assert!(d.unusual_center1);
        assert!(notes.is_empty());
        assert_eq!(d.to_string(), "100VHT160-5250");
        roundtrip(d);
    }

    #[test]
    fn vht_unsupported_channel_is_error() {
        // 165 is 20 MHz only.
        assert_eq!(
            ChannelDescriptor::parse("165VHT80"),
            Err(ChannelParseError::InvalidVht {
                chan: 165,
                width: 80
            })
        );
        // 149 has no 160 MHz segment.
        assert_eq!(
            ChannelDescriptor::parse("149VHT160"),
            Err(ChannelParseError::InvalidVht {
                chan: 149,
                width: 160
            })
        );
    }

    #[test]
    fn garbage_is_error() {
        assert!(matches!(
            ChannelDescriptor::parse("garbage"),
            Err(ChannelParseError::NoChannel(_))
        ));
        assert!(ChannelDescriptor::parse("").is_err());
    }

    #[test]
    fn unknown_suffix_degrades_with_note() {
        let (d, notes) = parse_ok("6Q");
        assert_eq!(d.control_freq, 6);
        assert_eq!(d.chan_type, ChannelType::None);
        assert_eq!(d.chan_width, ChannelWidth::Default);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn serialize_parses_back_for_all_forms() {
        for s in [
            "6", "2484", "36HT40+", "40HT40-", "6W5", "6W10", "36VHT80", "100VHT160",
            "36VHT80-5210", "100VHT160-5250",
        ] {
            let (d, _) = parse_ok(s);
            roundtrip(d);
        }
    }
}
