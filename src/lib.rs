// SPDX-License-Identifier: MIT

mod capture;
mod chancontrol;
mod channel;
mod control;
mod datasource;
mod framework;
mod ht_table;
mod ident;
mod netif;
mod nl80211;
#[cfg(feature = "networkmanager")]
mod nm;
mod prepare;
mod rfkill;
mod source;
mod wext;

pub(crate) mod bytes;

pub use self::chancontrol::{FailurePolicy, TuneVerdict, MAX_SEQ_CHANNEL_FAILURES};
pub use self::channel::{ChannelDescriptor, ChannelParseError, ChannelType, ChannelWidth};
pub use self::control::ControlPlane;
pub use self::datasource::WifiSource;
pub use self::framework::proto::{
    decode_data, ConfigureCommand, ConfigureResponse, DeviceRecord, Frame, FrameKind, HopBlock,
    ListResponse, MessageLevel, MessagePayload, OpenCommand, OpenResponse, ProbeCommand,
    ProbeResponse,
};
pub use self::framework::{
    CaptureFramework, ChannelSetOutcome, DataSource, FrameworkHandle, SendOutcome,
    HOP_SHUFFLE_SPACING,
};
pub use self::ht_table::{channel_from_mhz, lookup_ht_channel, HtChannel, HtFlags};
pub use self::ident::source_uuid;
pub use self::nl80211::{
    Nl80211ChannelWidth, Nl80211Error, Nl80211HtChannelType, Nl80211InterfaceType,
    Nl80211MonitorFlags, Nl80211Session,
};
pub use self::source::SourceDefinition;
pub use self::wext::WirelessMode;
