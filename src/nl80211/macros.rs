// SPDX-License-Identifier: MIT

/// Unwrap one netlink response message: inner messages pass through as
/// `Some`, acks (error code 0) become `None`, real errors and unexpected
/// payloads return out of the enclosing closure.
#[macro_export]
macro_rules! try_nl80211 {
    ($msg: expr) => {{
        use netlink_packet_core::{NetlinkMessage, NetlinkPayload};
        use $crate::Nl80211Error;

        match $msg {
            Ok(msg) => {
                let (header, payload) = msg.into_parts();
                match payload {
                    NetlinkPayload::InnerMessage(msg) => Some(msg),
                    NetlinkPayload::Error(err) if err.code.is_some() => {
                        return Err(Nl80211Error::NetlinkError(err))
                    }
                    // An ack; nothing to yield.
                    NetlinkPayload::Error(_) => None,
                    _ => {
                        return Err(Nl80211Error::UnexpectedMessage(
                            NetlinkMessage::new(header, payload),
                        ))
                    }
                }
            }
            Err(e) => {
                return Err(Nl80211Error::RequestFailed(format!(
                    "decode error {e:?}"
                )))
            }
        }
    }};
}
