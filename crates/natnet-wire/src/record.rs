use crate::cursor::ByteCursor;
use crate::error::Result;

/// A record with a fixed little-endian wire layout.
///
/// `decode` leaves the cursor on the first byte after the record, which is
/// how composite decoders find the next sibling.
pub trait WireRecord: Sized {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self>;

    /// Decode one record starting at `offset` and return it together with
    /// the offset just past it.
    fn decode_at(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut cur = ByteCursor::at(buf, offset)?;
        let record = Self::decode(&mut cur)?;
        Ok((record, cur.position()))
    }
}

/// Decode `count` records, capping the preallocation by what the payload
/// could possibly hold.
pub(crate) fn decode_n<T: WireRecord>(cur: &mut ByteCursor<'_>, count: u32) -> Result<Vec<T>> {
    let mut items = Vec::with_capacity((count as usize).min(cur.remaining()));
    for _ in 0..count {
        items.push(T::decode(cur)?);
    }
    Ok(items)
}

pub(crate) fn decode_cstrings(cur: &mut ByteCursor<'_>, count: u32) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity((count as usize).min(cur.remaining()));
    for _ in 0..count {
        names.push(cur.read_cstring()?);
    }
    Ok(names)
}

/// A position in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl WireRecord for Vec3 {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let [x, y, z] = cur.read_f32_array::<3>()?;
        Ok(Self { x, y, z })
    }
}

/// An orientation, transmitted as `w, x, y, z`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl WireRecord for Quaternion {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let [w, x, y, z] = cur.read_f32_array::<4>()?;
        Ok(Self { w, x, y, z })
    }
}

/// The `(count, byte_size)` pair in front of every composite frame kind.
///
/// `byte_size` is advisory: decoding advances by what the records consume,
/// and the size is only trusted to skip a kind that is not decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindHeader {
    pub count: u32,
    pub byte_size: u32,
}

impl KindHeader {
    pub const SIZE: usize = 8;
}

impl WireRecord for KindHeader {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let count = cur.read_u32()?;
        let byte_size = cur.read_u32()?;
        Ok(Self { count, byte_size })
    }
}
