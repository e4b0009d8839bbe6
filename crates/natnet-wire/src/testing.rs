//! Payload builders for tests and fake servers.
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-util` feature.

use bytes::{BufMut, BytesMut};

use crate::envelope::{encode_message, MessageKind};
use crate::error::Result;
use crate::version::ProtocolVersion;

/// Little-endian payload writer mirroring [`ByteCursor`](crate::ByteCursor).
#[derive(Debug, Default)]
pub struct PayloadBuilder {
    buf: BytesMut,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16_le(v);
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.buf.put_i16_le(v);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32_le(v);
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32_le(v);
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64_le(v);
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.buf.put_f32_le(v);
        self
    }

    pub fn f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_f64_le(v);
        self
    }

    pub fn f32s(&mut self, values: &[f32]) -> &mut Self {
        for &v in values {
            self.buf.put_f32_le(v);
        }
        self
    }

    pub fn cstring(&mut self, s: &str) -> &mut Self {
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.put_slice(b);
        self
    }

    /// Composite-kind header. Pass the real body size, or anything when the
    /// test does not exercise skipping.
    pub fn kind_header(&mut self, count: u32, byte_size: u32) -> &mut Self {
        self.u32(count).u32(byte_size)
    }

    /// Append a composite kind whose header size is computed from `body`.
    pub fn kind(&mut self, count: u32, body: &[u8]) -> &mut Self {
        self.kind_header(count, body.len() as u32).bytes(body)
    }

    /// Append a model-definition dataset whose size field is computed.
    pub fn dataset(&mut self, tag: u32, body: &[u8]) -> &mut Self {
        self.u32(tag).u32(body.len() as u32).bytes(body)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Wrap the current payload in an envelope of `kind`.
    pub fn message(&self, kind: MessageKind) -> Result<Vec<u8>> {
        let mut dst = BytesMut::new();
        encode_message(kind, &self.buf, &mut dst)?;
        Ok(dst.to_vec())
    }
}

/// Body of a rigid-body frame record.
pub fn rigid_body_record(id: i32, position: [f32; 3], error: f32, params: u16) -> Vec<u8> {
    PayloadBuilder::new()
        .i32(id)
        .f32s(&position)
        .f32s(&[1.0, 0.0, 0.0, 0.0])
        .f32(error)
        .u16(params)
        .build()
}

/// Body of the 50-byte frame suffix.
pub fn suffix_record(timecode: u32, timestamp: f64, params: u16) -> Vec<u8> {
    PayloadBuilder::new()
        .u32(timecode)
        .u32(0)
        .f64(timestamp)
        .u64(1_000)
        .u64(2_000)
        .u64(3_000)
        .u32(17)
        .u32(250)
        .u16(params)
        .build()
}

/// A ServerInfo payload as sent by a server running `name`.
pub fn server_info_payload(
    name: &str,
    server_version: ProtocolVersion,
    stream_version: ProtocolVersion,
) -> Vec<u8> {
    let mut field = [0u8; 256];
    let len = name.len().min(255);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
    PayloadBuilder::new()
        .bytes(&field)
        .bytes(&server_version.to_quad())
        .bytes(&stream_version.to_quad())
        .build()
}
