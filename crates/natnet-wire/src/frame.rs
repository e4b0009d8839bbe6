//! Frame-of-data decoding.
//!
//! A frame payload is a fixed sequence of kinds. Every composite kind opens
//! with a `(count, byte_size)` header; Prefix and Suffix are bare records.

use tracing::{debug, trace};

use crate::asset::{AssetFilter, AssetKind, Owner};
use crate::cursor::ByteCursor;
use crate::error::{Result, WireError};
use crate::record::{decode_n, KindHeader, Quaternion, Vec3, WireRecord};
use crate::version::ProtocolVersion;

/// Labeled-marker parameter flags.
pub mod marker_flags {
    pub const OCCLUDED: u16 = 0x01;
    pub const POINT_CLOUD_SOLVED: u16 = 0x02;
    pub const MODEL_SOLVED: u16 = 0x04;
    pub const HAS_MODEL: u16 = 0x08;
    pub const UNLABELED: u16 = 0x10;
    pub const ACTIVE: u16 = 0x20;
}

const SUFFIX_RECORDING: u16 = 0x01;
const SUFFIX_MODELS_CHANGED: u16 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FramePrefix {
    pub frame_number: u32,
}

impl FramePrefix {
    pub const SIZE: usize = 4;
}

impl WireRecord for FramePrefix {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            frame_number: cur.read_u32()?,
        })
    }
}

/// A named set of marker positions. An empty name marks the unlabeled set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MarkerSet {
    pub name: String,
    pub markers: Vec<Vec3>,
}

impl MarkerSet {
    pub fn is_unlabeled(&self) -> bool {
        self.name.is_empty()
    }
}

impl WireRecord for MarkerSet {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let name = cur.read_cstring()?;
        let count = cur.read_u32()?;
        let markers = decode_n(cur, count)?;
        Ok(Self { name, markers })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RigidBody {
    pub id: i32,
    pub position: Vec3,
    pub orientation: Quaternion,
    /// Mean marker error in metres.
    pub error: f32,
    pub params: u16,
    /// Set when the body was decoded as part of a skeleton.
    pub owner: Option<Owner>,
}

impl RigidBody {
    /// Only the least significant parameter bit carries meaning.
    pub fn tracking_valid(&self) -> bool {
        self.params & 0x01 != 0
    }
}

impl WireRecord for RigidBody {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            id: cur.read_i32()?,
            position: Vec3::decode(cur)?,
            orientation: Quaternion::decode(cur)?,
            error: cur.read_f32()?,
            params: cur.read_u16()?,
            owner: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Skeleton {
    pub id: i32,
    pub rigid_bodies: Vec<RigidBody>,
}

impl WireRecord for Skeleton {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let id = cur.read_i32()?;
        let count = cur.read_u32()?;
        let mut rigid_bodies: Vec<RigidBody> = decode_n(cur, count)?;
        for body in &mut rigid_bodies {
            body.owner = Some(Owner::Skeleton(id));
        }
        Ok(Self { id, rigid_bodies })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AssetRigidBody {
    pub id: i32,
    pub asset_id: i32,
    pub position: Vec3,
    pub orientation: Quaternion,
    pub error: f32,
    pub params: i16,
}

impl AssetRigidBody {
    pub fn tracking_valid(&self) -> bool {
        self.params & 0x01 != 0
    }

    fn decode_for(cur: &mut ByteCursor<'_>, asset_id: i32) -> Result<Self> {
        Ok(Self {
            id: cur.read_i32()?,
            asset_id,
            position: Vec3::decode(cur)?,
            orientation: Quaternion::decode(cur)?,
            error: cur.read_f32()?,
            params: cur.read_i16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AssetMarker {
    pub id: i32,
    pub asset_id: i32,
    pub position: Vec3,
    pub size: f32,
    pub params: i16,
    pub residual: f32,
}

impl AssetMarker {
    fn decode_for(cur: &mut ByteCursor<'_>, asset_id: i32) -> Result<Self> {
        Ok(Self {
            id: cur.read_i32()?,
            asset_id,
            position: Vec3::decode(cur)?,
            size: cur.read_f32()?,
            params: cur.read_i16()?,
            residual: cur.read_f32()?,
        })
    }
}

/// A trained-markerset asset with its rigid bodies and markers as direct
/// children.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Asset {
    pub id: i32,
    pub rigid_bodies: Vec<AssetRigidBody>,
    pub markers: Vec<AssetMarker>,
}

impl WireRecord for Asset {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let id = cur.read_i32()?;

        let rb_count = cur.read_u32()?;
        let mut rigid_bodies = Vec::with_capacity((rb_count as usize).min(cur.remaining()));
        for _ in 0..rb_count {
            rigid_bodies.push(AssetRigidBody::decode_for(cur, id)?);
        }

        let marker_count = cur.read_u32()?;
        let mut markers = Vec::with_capacity((marker_count as usize).min(cur.remaining()));
        for _ in 0..marker_count {
            markers.push(AssetMarker::decode_for(cur, id)?);
        }

        Ok(Self {
            id,
            rigid_bodies,
            markers,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LabeledMarker {
    /// Model id in the high 16 bits, marker id in the low 16 bits.
    pub encoded_id: u32,
    pub position: Vec3,
    pub size: f32,
    pub params: u16,
    pub residual: f32,
}

impl LabeledMarker {
    pub fn marker_id(&self) -> u16 {
        (self.encoded_id & 0xFFFF) as u16
    }

    pub fn model_id(&self) -> u16 {
        (self.encoded_id >> 16) as u16
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.params & flag != 0
    }

    pub fn is_occluded(&self) -> bool {
        self.has_flag(marker_flags::OCCLUDED)
    }

    pub fn is_point_cloud_solved(&self) -> bool {
        self.has_flag(marker_flags::POINT_CLOUD_SOLVED)
    }

    pub fn is_model_solved(&self) -> bool {
        self.has_flag(marker_flags::MODEL_SOLVED)
    }

    pub fn has_model(&self) -> bool {
        self.has_flag(marker_flags::HAS_MODEL)
    }

    pub fn is_unlabeled(&self) -> bool {
        self.has_flag(marker_flags::UNLABELED)
    }

    pub fn is_active(&self) -> bool {
        self.has_flag(marker_flags::ACTIVE)
    }
}

impl WireRecord for LabeledMarker {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            encoded_id: cur.read_u32()?,
            position: Vec3::decode(cur)?,
            size: cur.read_f32()?,
            params: cur.read_u16()?,
            residual: cur.read_f32()?,
        })
    }
}

/// One analog channel of a force plate or device, tagged with its owner.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AnalogChannel {
    pub owner_id: i32,
    pub index: u32,
    pub frames: Vec<f32>,
}

fn decode_channels(cur: &mut ByteCursor<'_>, owner_id: i32) -> Result<Vec<AnalogChannel>> {
    let channel_count = cur.read_u32()?;
    let mut channels = Vec::with_capacity((channel_count as usize).min(cur.remaining()));
    for index in 0..channel_count {
        let frame_count = cur.read_u32()?;
        let mut frames = Vec::with_capacity((frame_count as usize).min(cur.remaining() / 4));
        for _ in 0..frame_count {
            frames.push(cur.read_f32()?);
        }
        channels.push(AnalogChannel {
            owner_id,
            index,
            frames,
        });
    }
    Ok(channels)
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ForcePlate {
    pub id: i32,
    pub channels: Vec<AnalogChannel>,
}

impl WireRecord for ForcePlate {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let id = cur.read_i32()?;
        let channels = decode_channels(cur, id)?;
        Ok(Self { id, channels })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Device {
    pub id: i32,
    pub channels: Vec<AnalogChannel>,
}

impl WireRecord for Device {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let id = cur.read_i32()?;
        let channels = decode_channels(cur, id)?;
        Ok(Self { id, channels })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FrameSuffix {
    pub timecode: u32,
    pub timecode_sub: u32,
    /// Seconds since the server started streaming.
    pub timestamp: f64,
    /// High-resolution clock ticks.
    pub camera_mid_exposure: u64,
    pub data_received: u64,
    pub transmit: u64,
    pub precision_seconds: u32,
    pub precision_fraction: u32,
    pub params: u16,
}

impl FrameSuffix {
    pub const SIZE: usize = 50;

    pub fn is_recording(&self) -> bool {
        self.params & SUFFIX_RECORDING != 0
    }

    pub fn tracked_models_changed(&self) -> bool {
        self.params & SUFFIX_MODELS_CHANGED != 0
    }
}

impl WireRecord for FrameSuffix {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            timecode: cur.read_u32()?,
            timecode_sub: cur.read_u32()?,
            timestamp: cur.read_f64()?,
            camera_mid_exposure: cur.read_u64()?,
            data_received: cur.read_u64()?,
            transmit: cur.read_u64()?,
            precision_seconds: cur.read_u32()?,
            precision_fraction: cur.read_u32()?,
            params: cur.read_u16()?,
        })
    }
}

/// One decoded frame-of-data message.
///
/// `None` means the kind was not decoded (the payload ended before it, or
/// the filter disabled it); `Some(vec![])` means it was present with count 0.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FrameOfData {
    pub prefix: Option<FramePrefix>,
    pub marker_sets: Option<Vec<MarkerSet>>,
    pub legacy_markers: Option<Vec<Vec3>>,
    pub rigid_bodies: Option<Vec<RigidBody>>,
    pub skeletons: Option<Vec<Skeleton>>,
    pub assets: Option<Vec<Asset>>,
    pub labeled_markers: Option<Vec<LabeledMarker>>,
    pub force_plates: Option<Vec<ForcePlate>>,
    pub devices: Option<Vec<Device>>,
    pub suffix: Option<FrameSuffix>,
}

impl FrameOfData {
    pub fn frame_number(&self) -> Option<u32> {
        self.prefix.map(|p| p.frame_number)
    }

    /// Number of top-level records decoded for `kind`, or `None` when the
    /// kind is absent from this frame.
    pub fn record_count(&self, kind: AssetKind) -> Option<usize> {
        match kind {
            AssetKind::Prefix => self.prefix.map(|_| 1),
            AssetKind::MarkerSet => self.marker_sets.as_ref().map(Vec::len),
            AssetKind::LegacyMarkerSet => self.legacy_markers.as_ref().map(Vec::len),
            AssetKind::RigidBody => self.rigid_bodies.as_ref().map(Vec::len),
            AssetKind::Skeleton => self.skeletons.as_ref().map(Vec::len),
            AssetKind::Asset => self.assets.as_ref().map(Vec::len),
            AssetKind::LabeledMarker => self.labeled_markers.as_ref().map(Vec::len),
            AssetKind::ForcePlate => self.force_plates.as_ref().map(Vec::len),
            AssetKind::Device => self.devices.as_ref().map(Vec::len),
            AssetKind::Suffix => self.suffix.as_ref().map(|_| 1),
            AssetKind::Camera => None,
        }
    }

    /// Kinds present in this frame, in wire order.
    pub fn kinds(&self) -> Vec<AssetKind> {
        FrameLayout::CURRENT
            .kinds()
            .iter()
            .copied()
            .filter(|kind| self.record_count(*kind).is_some())
            .collect()
    }

    /// All skeleton bones flattened, each still tagged with its skeleton.
    pub fn skeleton_rigid_bodies(&self) -> impl Iterator<Item = &RigidBody> {
        self.skeletons
            .iter()
            .flatten()
            .flat_map(|s| s.rigid_bodies.iter())
    }
}

/// The ordered kind sequence a frame payload is decoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    kinds: &'static [AssetKind],
}

impl FrameLayout {
    /// Nested-record layout used by NatNet 4.1 and later.
    pub const CURRENT: FrameLayout = FrameLayout {
        kinds: &[
            AssetKind::Prefix,
            AssetKind::MarkerSet,
            AssetKind::LegacyMarkerSet,
            AssetKind::RigidBody,
            AssetKind::Skeleton,
            AssetKind::Asset,
            AssetKind::LabeledMarker,
            AssetKind::ForcePlate,
            AssetKind::Device,
            AssetKind::Suffix,
        ],
    };

    /// Oldest stream version the current layout decodes.
    pub const MIN_VERSION: ProtocolVersion = ProtocolVersion::new(4, 1);

    /// A custom dispatch sequence.
    pub const fn new(kinds: &'static [AssetKind]) -> Self {
        Self { kinds }
    }

    /// Select the layout for a negotiated stream version. An unset version
    /// (no ServerInfo seen yet) decodes with the current layout.
    pub fn for_version(version: ProtocolVersion) -> Result<Self> {
        if version.is_unset() || version >= Self::MIN_VERSION {
            Ok(Self::CURRENT)
        } else {
            Err(WireError::UnsupportedVersion(version))
        }
    }

    pub fn kinds(&self) -> &'static [AssetKind] {
        self.kinds
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Stateless frame decoder: a layout plus the set of kinds to materialize.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder {
    layout: FrameLayout,
    filter: AssetFilter,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_version(version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            layout: FrameLayout::for_version(version)?,
            filter: AssetFilter::default(),
        })
    }

    pub fn with_layout(mut self, layout: FrameLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_filter(mut self, filter: AssetFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn filter(&self) -> AssetFilter {
        self.filter
    }

    /// Decode a frame payload (everything after the envelope header).
    pub fn decode_payload(&self, payload: &[u8]) -> Result<FrameOfData> {
        self.decode(&mut ByteCursor::new(payload))
    }

    /// Decode a frame from the cursor, leaving it after the last kind read.
    ///
    /// Decoding stops without error when the payload ends on a kind
    /// boundary. Bytes left after the final kind are not consumed.
    pub fn decode(&self, cur: &mut ByteCursor<'_>) -> Result<FrameOfData> {
        let mut frame = FrameOfData::default();
        for &kind in self.layout.kinds() {
            if cur.is_empty() {
                trace!(%kind, "frame payload ended at kind boundary");
                break;
            }
            self.decode_kind(kind, cur, &mut frame)?;
        }
        if !cur.is_empty() {
            debug!(
                trailing = cur.remaining(),
                position = cur.position(),
                "ignoring trailing bytes after frame"
            );
        }
        Ok(frame)
    }

    fn decode_kind(
        &self,
        kind: AssetKind,
        cur: &mut ByteCursor<'_>,
        frame: &mut FrameOfData,
    ) -> Result<()> {
        match kind {
            AssetKind::Prefix => frame.prefix = self.decode_fixed(kind, cur, FramePrefix::SIZE)?,
            AssetKind::MarkerSet => frame.marker_sets = self.decode_list(kind, cur)?,
            AssetKind::LegacyMarkerSet => frame.legacy_markers = self.decode_list(kind, cur)?,
            AssetKind::RigidBody => frame.rigid_bodies = self.decode_list(kind, cur)?,
            AssetKind::Skeleton => frame.skeletons = self.decode_list(kind, cur)?,
            AssetKind::Asset => frame.assets = self.decode_list(kind, cur)?,
            AssetKind::LabeledMarker => frame.labeled_markers = self.decode_list(kind, cur)?,
            AssetKind::ForcePlate => frame.force_plates = self.decode_list(kind, cur)?,
            AssetKind::Device => frame.devices = self.decode_list(kind, cur)?,
            AssetKind::Suffix => frame.suffix = self.decode_fixed(kind, cur, FrameSuffix::SIZE)?,
            AssetKind::Camera => return Err(WireError::UnknownAssetKind(kind)),
        }
        Ok(())
    }

    fn decode_fixed<T: WireRecord>(
        &self,
        kind: AssetKind,
        cur: &mut ByteCursor<'_>,
        size: usize,
    ) -> Result<Option<T>> {
        if !self.filter.contains(kind) {
            cur.skip(size)?;
            return Ok(None);
        }
        T::decode(cur).map(Some)
    }

    fn decode_list<T: WireRecord>(
        &self,
        kind: AssetKind,
        cur: &mut ByteCursor<'_>,
    ) -> Result<Option<Vec<T>>> {
        let header = KindHeader::decode(cur)?;
        if !self.filter.contains(kind) {
            trace!(%kind, byte_size = header.byte_size, "skipping filtered kind");
            cur.skip(header.byte_size as usize)?;
            return Ok(None);
        }
        let items = decode_n(cur, header.count)?;
        trace!(%kind, count = items.len(), "decoded frame kind");
        Ok(Some(items))
    }
}

/// Decode a frame payload with the current layout and every kind enabled.
pub fn decode_frame(payload: &[u8]) -> Result<FrameOfData> {
    FrameDecoder::new().decode_payload(payload)
}
