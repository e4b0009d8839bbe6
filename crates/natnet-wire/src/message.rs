//! Handshake and command payloads.

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};

use crate::cursor::ByteCursor;
use crate::envelope::{encode_message, Message, MessageKind};
use crate::error::{Result, WireError};
use crate::version::ProtocolVersion;

/// Application signature that opens the Connect block.
pub const CLIENT_SIGNATURE: [u8; 4] = *b"Ping";

/// Width of the NUL-padded application-name field.
pub const NAME_FIELD_SIZE: usize = 256;

/// Zero padding between the signature and the requested version.
pub const CONNECT_PADDING: usize = 260;

/// Offset of the requested version quad within the Connect payload.
pub const CONNECT_VERSION_OFFSET: usize = CLIENT_SIGNATURE.len() + CONNECT_PADDING;

/// Connect payload: signature, padding, version quad and a NUL terminator.
pub const CONNECT_PAYLOAD_SIZE: usize = CONNECT_VERSION_OFFSET + 4 + 1;

/// ServerInfo payload without the optional connection block.
pub const SERVER_INFO_SIZE: usize = NAME_FIELD_SIZE + 8;

const CONNECTION_INFO_SIZE: usize = 15;

/// Encode the Connect request announcing `version`.
pub fn encode_connect(version: ProtocolVersion, dst: &mut BytesMut) -> Result<()> {
    let mut payload = BytesMut::with_capacity(CONNECT_PAYLOAD_SIZE);
    payload.put_slice(&CLIENT_SIGNATURE);
    payload.put_bytes(0, CONNECT_PADDING);
    payload.put_slice(&version.to_quad());
    payload.put_u8(0);
    encode_message(MessageKind::Connect, &payload, dst)
}

/// Encode a text command (`Request`) as UTF-8 plus a NUL terminator.
pub fn encode_command(command: &str, dst: &mut BytesMut) -> Result<()> {
    let mut payload = BytesMut::with_capacity(command.len() + 1);
    payload.put_slice(command.as_bytes());
    payload.put_u8(0);
    encode_message(MessageKind::Request, &payload, dst)
}

/// Encode a header-only request such as KeepAlive or RequestModelDef.
pub fn encode_bare(kind: MessageKind, dst: &mut BytesMut) -> Result<()> {
    encode_message(kind, &[], dst)
}

/// How the server is configured to stream, appended to newer ServerInfo
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConnectionInfo {
    pub high_resolution_clock_frequency: u64,
    pub data_port: u16,
    pub is_multicast: bool,
    pub multicast_address: Ipv4Addr,
}

/// The server's reply to Connect.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ServerInfo {
    pub application_name: String,
    pub server_version: ProtocolVersion,
    pub stream_version: ProtocolVersion,
    pub connection: Option<ConnectionInfo>,
}

impl ServerInfo {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cur = ByteCursor::new(payload);
        let application_name = cur.read_fixed_str(NAME_FIELD_SIZE)?;
        let server_version = read_quad(&mut cur)?;
        let stream_version = read_quad(&mut cur)?;

        let connection = if cur.remaining() >= CONNECTION_INFO_SIZE {
            let high_resolution_clock_frequency = cur.read_u64()?;
            let data_port = cur.read_u16()?;
            let is_multicast = cur.read_u8()? != 0;
            let octets = read_quad(&mut cur)?.to_quad();
            Some(ConnectionInfo {
                high_resolution_clock_frequency,
                data_port,
                is_multicast,
                multicast_address: Ipv4Addr::from(octets),
            })
        } else {
            None
        };

        Ok(Self {
            application_name,
            server_version,
            stream_version,
            connection,
        })
    }

    pub fn from_message(msg: &Message<'_>) -> Result<Self> {
        expect_kind(msg, MessageKind::ServerInfo)?;
        Self::decode(msg.payload)
    }
}

fn read_quad(cur: &mut ByteCursor<'_>) -> Result<ProtocolVersion> {
    let bytes = cur.read_bytes(4)?;
    Ok(ProtocolVersion::from_quad([
        bytes[0], bytes[1], bytes[2], bytes[3],
    ]))
}

fn expect_kind(msg: &Message<'_>, expected: MessageKind) -> Result<()> {
    if msg.kind != expected {
        return Err(WireError::UnexpectedMessage {
            expected: expected.name(),
            actual: msg.kind.name(),
        });
    }
    Ok(())
}

/// Reply to a text command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CommandResponse {
    /// A 4-byte result code; zero is success.
    Code(i32),
    /// A text reply, such as `Bitstream,4.1`.
    Text(String),
}

impl CommandResponse {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cur = ByteCursor::new(payload);
        if payload.len() == 4 {
            return Ok(CommandResponse::Code(cur.read_i32()?));
        }
        Ok(CommandResponse::Text(read_text(&mut cur)))
    }

    pub fn from_message(msg: &Message<'_>) -> Result<Self> {
        expect_kind(msg, MessageKind::Response)?;
        Self::decode(msg.payload)
    }

    /// The stream version a `Bitstream,X.Y` reply reports.
    pub fn bitstream_version(&self) -> Option<ProtocolVersion> {
        match self {
            CommandResponse::Text(text) => ProtocolVersion::from_bitstream_reply(text),
            CommandResponse::Code(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandResponse::Code(0))
    }
}

/// Decode a MessageString payload.
pub fn decode_text(payload: &[u8]) -> String {
    read_text(&mut ByteCursor::new(payload))
}

/// NUL-terminated text, or the whole remainder if the terminator is missing.
fn read_text(cur: &mut ByteCursor<'_>) -> String {
    match cur.read_cstring() {
        Ok(text) => text,
        Err(_) => String::from_utf8_lossy(cur.rest()).into_owned(),
    }
}
