// SPDX-License-Identifier: MIT

use anyhow::Context;
use netlink_packet_generic::{GenlFamily, GenlHeader};
use netlink_packet_utils::{
    nla::NlasIterator, DecodeError, Emitable, Parseable, ParseableParametrized,
};

use super::Nl80211Attr;

const NL80211_CMD_GET_WIPHY: u8 = 1;
const NL80211_CMD_NEW_WIPHY: u8 = 3;
const NL80211_CMD_NEW_INTERFACE: u8 = 7;
const NL80211_CMD_SET_CHANNEL: u8 = 65;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Nl80211Command {
    GetWiphy,
    NewWiphy,
    NewInterface,
    SetChannel,
}

impl From<Nl80211Command> for u8 {
    fn from(cmd: Nl80211Command) -> Self {
        match cmd {
            Nl80211Command::GetWiphy => NL80211_CMD_GET_WIPHY,
            Nl80211Command::NewWiphy => NL80211_CMD_NEW_WIPHY,
            Nl80211Command::NewInterface => NL80211_CMD_NEW_INTERFACE,
            Nl80211Command::SetChannel => NL80211_CMD_SET_CHANNEL,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Nl80211Message {
    pub cmd: Nl80211Command,
    pub attributes: Vec<Nl80211Attr>,
}

impl GenlFamily for Nl80211Message {
    fn family_name() -> &'static str {
        "nl80211"
    }

    fn version(&self) -> u8 {
        1
    }

    fn command(&self) -> u8 {
        self.cmd.into()
    }
}

impl Emitable for Nl80211Message {
    fn buffer_len(&self) -> usize {
        self.attributes.as_slice().buffer_len()
    }

    fn emit(&self, buffer: &mut [u8]) {
        self.attributes.as_slice().emit(buffer)
    }
}

impl Nl80211Message {
    /// Decode one reply. Only the two reply kinds this helper ever
    /// solicits are accepted: interface and wiphy notifications.
    fn parse_reply(
        cmd: Nl80211Command,
        buffer: &[u8],
    ) -> Result<Self, DecodeError> {
        let mut attributes = Vec::new();
        for (index, nla) in NlasIterator::new(buffer).enumerate() {
            let nla = &nla.context(format!(
                "bad attribute at position {index} in a {cmd:?} reply"
            ))?;
            attributes.push(Nl80211Attr::parse(nla).context(format!(
                "undecodable attribute kind {} in a {cmd:?} reply",
                nla.kind()
            ))?);
        }
        Ok(Self { cmd, attributes })
    }
}

impl ParseableParametrized<[u8], GenlHeader> for Nl80211Message {
    fn parse_with_param(
        buffer: &[u8],
        header: GenlHeader,
    ) -> Result<Self, DecodeError> {
        let cmd = match header.cmd {
            NL80211_CMD_NEW_INTERFACE => Nl80211Command::NewInterface,
            NL80211_CMD_NEW_WIPHY => Nl80211Command::NewWiphy,
            other => {
                return Err(DecodeError::from(format!(
                    "unsolicited nl80211 reply command {other}"
                )))
            }
        };
        Self::parse_reply(cmd, buffer)
    }
}
