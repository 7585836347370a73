// SPDX-License-Identifier: MIT

//! Wire framing for the parent control channel.
//!
//! Every frame is a fixed header followed by a payload:
//!
//! ```text
//! magic(u32 BE) kind(u8) seqno(u32 BE) length(u32 BE) payload
//! ```
//!
//! Control payloads are JSON documents; DATA payloads are binary:
//! `tv_sec(u64 BE) tv_usec(u32 BE) dlt(u32 BE) caplen(u32 BE) bytes`.

use std::io;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

pub const FRAME_MAGIC: u32 = 0x5743_4150; // "WCAP"

const FRAME_HEADER_LEN: usize = 13;

/// Upper bound on a payload; anything bigger is a desynchronized stream.
const MAX_PAYLOAD: u32 = 1 << 22;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum FrameKind {
    List = 1,
    Probe = 2,
    Open = 3,
    Configure = 4,
    ListResp = 5,
    ProbeResp = 6,
    OpenResp = 7,
    ConfigureResp = 8,
    Message = 9,
    Error = 10,
    Data = 11,
}

impl TryFrom<u8> for FrameKind {
    type Error = io::Error;

    fn try_from(d: u8) -> io::Result<Self> {
        Ok(match d {
            1 => Self::List,
            2 => Self::Probe,
            3 => Self::Open,
            4 => Self::Configure,
            5 => Self::ListResp,
            6 => Self::ProbeResp,
            7 => Self::OpenResp,
            8 => Self::ConfigureResp,
            9 => Self::Message,
            10 => FrameKind::Error,
            11 => Self::Data,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown frame kind {other}"),
                ))
            }
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub seqno: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn control<T: Serialize>(
        kind: FrameKind,
        seqno: u32,
        payload: &T,
    ) -> io::Result<Self> {
        let payload = serde_json::to_vec(payload)?;
        Ok(Frame {
            kind,
            seqno,
            payload,
        })
    }

    pub fn message(level: MessageLevel, msg: impl Into<String>) -> io::Result<Self> {
        Self::control(
            FrameKind::Message,
            0,
            &MessagePayload {
                level,
                msg: msg.into(),
            },
        )
    }

    /// Unsolicited fatal error, distinct from ERROR-level diagnostics.
    pub fn fatal_error(msg: impl Into<String>) -> io::Result<Self> {
        Self::control(
            FrameKind::Error,
            0,
            &MessagePayload {
                level: MessageLevel::Error,
                msg: msg.into(),
            },
        )
    }

    pub fn data(ts_sec: u64, ts_usec: u32, dlt: u32, bytes: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(20 + bytes.len());
        // The writes below cannot fail on a Vec.
        let _ = payload.write_u64::<BigEndian>(ts_sec);
        let _ = payload.write_u32::<BigEndian>(ts_usec);
        let _ = payload.write_u32::<BigEndian>(dlt);
        let _ = payload.write_u32::<BigEndian>(bytes.len() as u32);
        payload.extend_from_slice(bytes);
        Frame {
            kind: FrameKind::Data,
            seqno: 0,
            payload,
        }
    }

    pub fn decode_json<T: DeserializeOwned>(&self) -> io::Result<T> {
        serde_json::from_slice(&self.payload).map_err(io::Error::from)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        let _ = out.write_u32::<BigEndian>(FRAME_MAGIC);
        let _ = out.write_u8(self.kind as u8);
        let _ = out.write_u32::<BigEndian>(self.seqno);
        let _ = out.write_u32::<BigEndian>(self.payload.len() as u32);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Read one frame. `Ok(None)` is a clean end of stream at a frame
    /// boundary.
    pub async fn read_from<R: AsyncRead + Unpin>(
        reader: &mut R,
    ) -> io::Result<Option<Frame>> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        match reader.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        }

        let magic = BigEndian::read_u32(&header[0..4]);
        if magic != FRAME_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad frame magic {magic:#010x}"),
            ));
        }
        let kind = FrameKind::try_from(header[4])?;
        let seqno = BigEndian::read_u32(&header[5..9]);
        let length = BigEndian::read_u32(&header[9..13]);
        if length > MAX_PAYLOAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("oversized frame payload ({length} bytes)"),
            ));
        }

        let mut payload = vec![0u8; length as usize];
        reader.read_exact(&mut payload).await?;
        Ok(Some(Frame {
            kind,
            seqno,
            payload,
        }))
    }
}

/// Split a DATA payload back into its parts. Only used by tests and by
/// anyone debugging the stream; the helper itself never reads DATA frames.
pub fn decode_data(payload: &[u8]) -> io::Result<(u64, u32, u32, &[u8])> {
    if payload.len() < 20 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "short DATA payload",
        ));
    }
    let ts_sec = BigEndian::read_u64(&payload[0..8]);
    let ts_usec = BigEndian::read_u32(&payload[8..12]);
    let dlt = BigEndian::read_u32(&payload[12..16]);
    let caplen = BigEndian::read_u32(&payload[16..20]) as usize;
    if payload.len() < 20 + caplen {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "truncated DATA payload",
        ));
    }
    Ok((ts_sec, ts_usec, dlt, &payload[20..20 + caplen]))
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Error,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub level: MessageLevel,
    pub msg: String,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeCommand {
    pub definition: String,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCommand {
    pub definition: String,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureCommand {
    /// Explicit channel to tune to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Channel hopping setup; mutually exclusive with `channel`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hop: Option<HopBlock>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct HopBlock {
    /// Hop rate in channels per second.
    pub rate: f64,
    pub channels: Vec<String>,
    #[serde(default)]
    pub shuffle: bool,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device: String,
    pub flags: String,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub msg: String,
    pub devices: Vec<DeviceRecord>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub success: bool,
    pub msg: String,
    pub channels: Vec<String>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenResponse {
    pub success: bool,
    pub msg: String,
    pub uuid: String,
    pub capture_interface: String,
    pub dlt: i32,
    pub channels: Vec<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureResponse {
    pub success: bool,
    pub msg: String,
    pub channel: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn control_frame_roundtrip() {
        let frame = Frame::control(
            FrameKind::Probe,
            7,
            &ProbeCommand {
                definition: "wlan0:fcsfail=true".to_string(),
            },
        )
        .unwrap();
        let encoded = frame.encode();

        let mut cursor = std::io::Cursor::new(encoded);
        let decoded = Frame::read_from(&mut cursor).await.unwrap().unwrap();
        assert_eq!(decoded, frame);
        let cmd: ProbeCommand = decoded.decode_json().unwrap();
        assert_eq!(cmd.definition, "wlan0:fcsfail=true");
    }

    #[tokio::test]
    async fn data_frame_roundtrip() {
        let bytes = [0xAAu8, 0xBB, 0xCC, 0xDD];
        let frame = Frame::data(1_700_000_000, 250_000, 127, &bytes);
        let encoded = frame.encode();

        let mut cursor = std::io::Cursor::new(encoded);
        let decoded = Frame::read_from(&mut cursor).await.unwrap().unwrap();
        let (ts_sec, ts_usec, dlt, data) =
            decode_data(&decoded.payload).unwrap();
        assert_eq!(ts_sec, 1_700_000_000);
        assert_eq!(ts_usec, 250_000);
        assert_eq!(dlt, 127);
        assert_eq!(data, bytes);
    }

    #[tokio::test]
    async fn eof_at_boundary_is_clean() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        assert_eq!(Frame::read_from(&mut cursor).await.unwrap(), None);
    }

    #[tokio::test]
    async fn bad_magic_is_rejected() {
        let mut encoded = Frame::message(MessageLevel::Info, "x")
            .unwrap()
            .encode();
        encoded[0] ^= 0xFF;
        let mut cursor = std::io::Cursor::new(encoded);
        assert!(Frame::read_from(&mut cursor).await.is_err());
    }

    #[test]
    fn configure_command_forms() {
        let explicit: ConfigureCommand =
            serde_json::from_str(r#"{"channel":"6HT40+"}"#).unwrap();
        assert_eq!(explicit.channel.as_deref(), Some("6HT40+"));
        assert!(explicit.hop.is_none());

        let hop: ConfigureCommand = serde_json::from_str(
            r#"{"hop":{"rate":5.0,"channels":["1","6","11"],"shuffle":true}}"#,
        )
        .unwrap();
        let hop = hop.hop.unwrap();
        assert_eq!(hop.channels.len(), 3);
        assert!(hop.shuffle);
    }
}
