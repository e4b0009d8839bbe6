use bytes::{BufMut, BytesMut};

use crate::cursor::ByteCursor;
use crate::error::{Result, WireError};

/// Envelope header: kind (2) + payload length (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Receive buffer size used for both channels.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// NatNet message kinds carried in the envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u16)]
pub enum MessageKind {
    Connect = 0,
    ServerInfo = 1,
    Request = 2,
    Response = 3,
    RequestModelDef = 4,
    ModelDef = 5,
    RequestFrameOfData = 6,
    FrameOfData = 7,
    MessageString = 8,
    Disconnect = 9,
    KeepAlive = 10,
    UnrecognizedRequest = 100,
}

impl MessageKind {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Connect => "Connect",
            MessageKind::ServerInfo => "ServerInfo",
            MessageKind::Request => "Request",
            MessageKind::Response => "Response",
            MessageKind::RequestModelDef => "RequestModelDef",
            MessageKind::ModelDef => "ModelDef",
            MessageKind::RequestFrameOfData => "RequestFrameOfData",
            MessageKind::FrameOfData => "FrameOfData",
            MessageKind::MessageString => "MessageString",
            MessageKind::Disconnect => "Disconnect",
            MessageKind::KeepAlive => "KeepAlive",
            MessageKind::UnrecognizedRequest => "UnrecognizedRequest",
        }
    }
}

impl TryFrom<u16> for MessageKind {
    type Error = WireError;

    fn try_from(value: u16) -> Result<Self> {
        Ok(match value {
            0 => MessageKind::Connect,
            1 => MessageKind::ServerInfo,
            2 => MessageKind::Request,
            3 => MessageKind::Response,
            4 => MessageKind::RequestModelDef,
            5 => MessageKind::ModelDef,
            6 => MessageKind::RequestFrameOfData,
            7 => MessageKind::FrameOfData,
            8 => MessageKind::MessageString,
            9 => MessageKind::Disconnect,
            10 => MessageKind::KeepAlive,
            100 => MessageKind::UnrecognizedRequest,
            other => return Err(WireError::UnknownMessageKind(other)),
        })
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The 4-byte header in front of every NatNet payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub kind: MessageKind,
    pub payload_length: u16,
}

impl MessageHeader {
    /// Read the header and advance the cursor to the first payload byte.
    pub fn read(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let start = cur.clone();
        let raw_kind = cur.read_u16()?;
        let kind = match MessageKind::try_from(raw_kind) {
            Ok(kind) => kind,
            Err(err) => {
                *cur = start;
                return Err(err);
            }
        };
        let payload_length = match cur.read_u16() {
            Ok(len) => len,
            Err(err) => {
                *cur = start;
                return Err(err);
            }
        };
        Ok(Self {
            kind,
            payload_length,
        })
    }
}

/// A received message with its payload borrowed from the datagram.
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    pub kind: MessageKind,
    pub payload: &'a [u8],
}

impl<'a> Message<'a> {
    /// A cursor over the payload only.
    pub fn cursor(&self) -> ByteCursor<'a> {
        ByteCursor::new(self.payload)
    }

    /// Total wire size (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a message envelope into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬────────────────┬──────────────────┐
/// │ Kind (2B LE) │ Length (2B LE) │ Payload          │
/// │              │                │ (Length bytes)   │
/// └──────────────┴────────────────┴──────────────────┘
/// ```
pub fn encode_message(kind: MessageKind, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(WireError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u16_le(kind.as_u16());
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Split a datagram into its kind and payload.
///
/// Bytes past the declared payload length are ignored. A datagram shorter
/// than its declared length is an underrun.
pub fn decode_message(datagram: &[u8]) -> Result<Message<'_>> {
    let mut cur = ByteCursor::new(datagram);
    let header = MessageHeader::read(&mut cur)?;
    let payload = cur.read_bytes(header.payload_length as usize)?;
    Ok(Message {
        kind: header.kind,
        payload,
    })
}

/// Peek at the message kind without validating the rest of the datagram.
pub fn peek_kind(datagram: &[u8]) -> Result<MessageKind> {
    ByteCursor::new(datagram)
        .read_u16()
        .and_then(MessageKind::try_from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header_layout() {
        let mut buf = BytesMut::new();
        encode_message(MessageKind::Request, b"Bitstream\0", &mut buf).unwrap();

        assert_eq!(&buf[..4], &[2, 0, 10, 0]);
        assert_eq!(&buf[4..], b"Bitstream\0");
    }

    #[test]
    fn test_decode_message() {
        let mut buf = BytesMut::new();
        encode_message(MessageKind::MessageString, b"hi\0", &mut buf).unwrap();

        let msg = decode_message(&buf).unwrap();
        assert_eq!(msg.kind, MessageKind::MessageString);
        assert_eq!(msg.payload, b"hi\0");
        assert_eq!(msg.wire_size(), buf.len());
    }

    #[test]
    fn test_header_only_message() {
        let mut buf = BytesMut::new();
        encode_message(MessageKind::KeepAlive, &[], &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[10, 0, 0, 0]);

        let msg = decode_message(&buf).unwrap();
        assert_eq!(msg.kind, MessageKind::KeepAlive);
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn test_decode_ignores_bytes_past_declared_length() {
        let buf = [7u8, 0, 2, 0, 0xAA, 0xBB, 0xCC];
        let msg = decode_message(&buf).unwrap();
        assert_eq!(msg.payload, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_decode_short_payload() {
        let buf = [7u8, 0, 8, 0, 1, 2];
        assert!(matches!(
            decode_message(&buf),
            Err(WireError::BufferUnderrun { needed: 8, .. })
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let buf = [0x2A, 0x00, 0, 0];
        assert_eq!(
            decode_message(&buf).unwrap_err(),
            WireError::UnknownMessageKind(42)
        );
        assert_eq!(peek_kind(&buf).unwrap_err(), WireError::UnknownMessageKind(42));
    }

    #[test]
    fn test_unrecognized_request_kind() {
        assert_eq!(
            MessageKind::try_from(100).unwrap(),
            MessageKind::UnrecognizedRequest
        );
        assert!(MessageKind::try_from(11).is_err());
    }

    #[test]
    fn test_header_read_restores_cursor_on_error() {
        let buf = [0xFFu8, 0xFF, 0, 0];
        let mut cur = ByteCursor::new(&buf);
        assert!(MessageHeader::read(&mut cur).is_err());
        assert_eq!(cur.position(), 0);
    }

    #[test]
    fn test_payload_too_large() {
        let mut buf = BytesMut::new();
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            encode_message(MessageKind::Request, &payload, &mut buf),
            Err(WireError::PayloadTooLarge { .. })
        ));
        assert!(buf.is_empty());
    }
}
