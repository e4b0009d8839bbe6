use bytes::Buf;

use crate::error::{Result, WireError};

/// Bounds-checked little-endian read cursor over a received datagram.
///
/// Every read either consumes exactly the bytes it decodes or fails without
/// moving the cursor, so a failed record never leaves the position inside
/// a half-read field.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Create a cursor positioned at `offset` within `buf`.
    pub fn at(buf: &'a [u8], offset: usize) -> Result<Self> {
        if offset > buf.len() {
            return Err(WireError::BufferUnderrun {
                needed: offset,
                remaining: buf.len(),
                position: 0,
            });
        }
        Ok(Self { buf, pos: offset })
    }

    /// Current absolute offset into the underlying buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The whole underlying buffer, independent of position.
    pub fn get_ref(&self) -> &'a [u8] {
        self.buf
    }

    /// The unread tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        let buf = self.buf;
        &buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(WireError::BufferUnderrun {
                needed: n,
                remaining: self.remaining(),
                position: self.pos,
            });
        }
        let buf = self.buf;
        let bytes = &buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Advance past `n` bytes without decoding them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(WireError::BufferUnderrun {
                needed: 1,
                remaining: 0,
                position: self.pos,
            })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16_le())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.take(2)?.get_i16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32_le())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.take(4)?.get_i32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.take(8)?.get_u64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.take(4)?.get_f32_le())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.take(8)?.get_f64_le())
    }

    /// Read `N` consecutive `f32` values.
    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut bytes = self.take(N * 4)?;
        let mut out = [0.0f32; N];
        for value in &mut out {
            *value = bytes.get_f32_le();
        }
        Ok(out)
    }

    /// Read a NUL-terminated string and consume its terminator.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; server-side names are
    /// user-entered and occasionally carry legacy code-page bytes.
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.pos;
        let tail = self.rest();
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(WireError::TruncatedString { position: start })?;
        let text = String::from_utf8_lossy(&tail[..len]).into_owned();
        self.pos += len + 1;
        Ok(text)
    }

    /// Read a fixed-width, NUL-padded text field of exactly `len` bytes.
    pub fn read_fixed_str(&mut self, len: usize) -> Result<String> {
        let field = self.take(len)?;
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        Ok(String::from_utf8_lossy(&field[..end]).into_owned())
    }
}
