// SPDX-License-Identifier: MIT

//! Minimal nl80211 dialect over generic netlink.
//!
//! Only the slice of nl80211 this helper drives: interface enumeration,
//! monitor vif creation, width-aware channel tuning, and the wiphy band dump
//! the channel list is built from.

mod attr;
mod band;
mod connection;
mod error;
mod handle;
mod iface_type;
mod macros;
mod message;
mod monitor;
mod session;
mod width;

pub use self::attr::Nl80211Attr;
pub use self::band::{Nl80211Band, Nl80211BandInfo, Nl80211BandType, Nl80211Frequency, Nl80211FrequencyInfo};
pub use self::connection::new_connection;
pub use self::error::Nl80211Error;
pub use self::handle::Nl80211Handle;
pub use self::iface_type::Nl80211InterfaceType;
pub use self::message::{Nl80211Command, Nl80211Message};
pub use self::monitor::Nl80211MonitorFlags;
pub use self::session::Nl80211Session;
pub use self::width::{Nl80211ChannelWidth, Nl80211HtChannelType};

pub(crate) use self::handle::nl80211_execute;
