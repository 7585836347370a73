// SPDX-License-Identifier: MIT

use thiserror::Error;

use netlink_packet_core::{ErrorMessage, NetlinkMessage};
use netlink_packet_generic::GenlMessage;

use super::Nl80211Message;

#[derive(Debug, Error)]
pub enum Nl80211Error {
    #[error("received an unexpected message {0:?}")]
    UnexpectedMessage(NetlinkMessage<GenlMessage<Nl80211Message>>),

    #[error("received a netlink error message: {0}")]
    NetlinkError(ErrorMessage),

    #[error("netlink request failed: {0}")]
    RequestFailed(String),

    #[error("failed to open a generic netlink socket: {0}")]
    Socket(#[from] std::io::Error),
}
