//! Model-definition (data description) decoding.

use tracing::{debug, trace, warn};

use crate::asset::{AssetFilter, AssetKind, Owner};
use crate::cursor::ByteCursor;
use crate::error::{Result, WireError};
use crate::record::{decode_cstrings, decode_n, Quaternion, Vec3, WireRecord};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MarkerSetDescription {
    pub name: String,
    pub marker_names: Vec<String>,
}

impl WireRecord for MarkerSetDescription {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let name = cur.read_cstring()?;
        let count = cur.read_u32()?;
        let marker_names = decode_cstrings(cur, count)?;
        Ok(Self { name, marker_names })
    }
}

/// One marker of a rigid body, assembled from the three per-marker arrays.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RigidBodyMarkerDescription {
    pub offset: Vec3,
    pub active_label: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RigidBodyDescription {
    pub name: String,
    pub id: i32,
    pub parent_id: i32,
    /// Offset from the parent's origin.
    pub offset: Vec3,
    pub markers: Vec<RigidBodyMarkerDescription>,
    /// Set when described as a skeleton bone or asset body.
    pub owner: Option<Owner>,
}

impl WireRecord for RigidBodyDescription {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let name = cur.read_cstring()?;
        let id = cur.read_i32()?;
        let parent_id = cur.read_i32()?;
        let offset = Vec3::decode(cur)?;
        let marker_count = cur.read_u32()?;

        // Offsets, active labels and names arrive as three consecutive arrays.
        let offsets: Vec<Vec3> = decode_n(cur, marker_count)?;
        let mut labels = Vec::with_capacity(offsets.len());
        for _ in 0..marker_count {
            labels.push(cur.read_i32()?);
        }
        let names = decode_cstrings(cur, marker_count)?;

        let markers = offsets
            .into_iter()
            .zip(labels)
            .zip(names)
            .map(|((offset, active_label), name)| RigidBodyMarkerDescription {
                offset,
                active_label,
                name,
            })
            .collect();

        Ok(Self {
            name,
            id,
            parent_id,
            offset,
            markers,
            owner: None,
        })
    }
}

fn decode_owned_bodies(
    cur: &mut ByteCursor<'_>,
    owner: Owner,
) -> Result<Vec<RigidBodyDescription>> {
    let count = cur.read_u32()?;
    let mut bodies: Vec<RigidBodyDescription> = decode_n(cur, count)?;
    for body in &mut bodies {
        body.owner = Some(owner);
    }
    Ok(bodies)
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SkeletonDescription {
    pub name: String,
    pub id: i32,
    pub rigid_bodies: Vec<RigidBodyDescription>,
}

impl WireRecord for SkeletonDescription {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let name = cur.read_cstring()?;
        let id = cur.read_i32()?;
        let rigid_bodies = decode_owned_bodies(cur, Owner::Skeleton(id))?;
        Ok(Self {
            name,
            id,
            rigid_bodies,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ForcePlateDescription {
    pub id: i32,
    pub serial: String,
    pub width: f32,
    pub length: f32,
    pub origin: Vec3,
    pub calibration_matrix: [[f32; 12]; 12],
    pub corners: [[f32; 3]; 4],
    pub plate_type: i32,
    pub channel_data_type: i32,
    pub channel_names: Vec<String>,
}

impl WireRecord for ForcePlateDescription {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let id = cur.read_i32()?;
        let serial = cur.read_cstring()?;
        let width = cur.read_f32()?;
        let length = cur.read_f32()?;
        let origin = Vec3::decode(cur)?;

        let mut calibration_matrix = [[0.0f32; 12]; 12];
        for row in &mut calibration_matrix {
            *row = cur.read_f32_array::<12>()?;
        }
        let mut corners = [[0.0f32; 3]; 4];
        for corner in &mut corners {
            *corner = cur.read_f32_array::<3>()?;
        }

        let plate_type = cur.read_i32()?;
        let channel_data_type = cur.read_i32()?;
        let channel_count = cur.read_u32()?;
        let channel_names = decode_cstrings(cur, channel_count)?;

        Ok(Self {
            id,
            serial,
            width,
            length,
            origin,
            calibration_matrix,
            corners,
            plate_type,
            channel_data_type,
            channel_names,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeviceDescription {
    pub id: i32,
    pub name: String,
    pub serial: String,
    pub device_type: i32,
    pub channel_data_type: i32,
    pub channel_names: Vec<String>,
}

impl WireRecord for DeviceDescription {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let id = cur.read_i32()?;
        let name = cur.read_cstring()?;
        let serial = cur.read_cstring()?;
        let device_type = cur.read_i32()?;
        let channel_data_type = cur.read_i32()?;
        let channel_count = cur.read_u32()?;
        let channel_names = decode_cstrings(cur, channel_count)?;
        Ok(Self {
            id,
            name,
            serial,
            device_type,
            channel_data_type,
            channel_names,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CameraDescription {
    pub name: String,
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl WireRecord for CameraDescription {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            name: cur.read_cstring()?,
            position: Vec3::decode(cur)?,
            orientation: Quaternion::decode(cur)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AssetDescription {
    pub name: String,
    pub asset_type: i32,
    pub id: i32,
    pub rigid_bodies: Vec<RigidBodyDescription>,
    pub marker_names: Vec<String>,
}

impl WireRecord for AssetDescription {
    fn decode(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let name = cur.read_cstring()?;
        let asset_type = cur.read_i32()?;
        let id = cur.read_i32()?;
        let rigid_bodies = decode_owned_bodies(cur, Owner::Asset(id))?;
        let marker_count = cur.read_u32()?;
        let marker_names = decode_cstrings(cur, marker_count)?;
        Ok(Self {
            name,
            asset_type,
            id,
            rigid_bodies,
            marker_names,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SkipReason {
    UnknownKind,
    Filtered,
}

/// A dataset passed over using its size field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SkippedDataset {
    pub tag: u32,
    pub size: u32,
    pub reason: SkipReason,
}

/// Every description in one model-definition message, in wire order per kind.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModelDefinitions {
    pub marker_sets: Vec<MarkerSetDescription>,
    pub rigid_bodies: Vec<RigidBodyDescription>,
    pub skeletons: Vec<SkeletonDescription>,
    pub force_plates: Vec<ForcePlateDescription>,
    pub devices: Vec<DeviceDescription>,
    pub cameras: Vec<CameraDescription>,
    pub assets: Vec<AssetDescription>,
    pub skipped: Vec<SkippedDataset>,
}

impl ModelDefinitions {
    /// Number of descriptions of `kind`; `None` for kinds that are never
    /// described.
    pub fn record_count(&self, kind: AssetKind) -> Option<usize> {
        match kind {
            AssetKind::MarkerSet => Some(self.marker_sets.len()),
            AssetKind::RigidBody => Some(self.rigid_bodies.len()),
            AssetKind::Skeleton => Some(self.skeletons.len()),
            AssetKind::ForcePlate => Some(self.force_plates.len()),
            AssetKind::Device => Some(self.devices.len()),
            AssetKind::Camera => Some(self.cameras.len()),
            AssetKind::Asset => Some(self.assets.len()),
            _ => None,
        }
    }

    /// Kinds with at least one description, in tag order.
    pub fn kinds(&self) -> Vec<AssetKind> {
        (0..)
            .map_while(AssetKind::from_description_tag)
            .filter(|kind| self.record_count(*kind).unwrap_or(0) > 0)
            .collect()
    }

    /// Total number of decoded descriptions.
    pub fn len(&self) -> usize {
        self.kinds()
            .into_iter()
            .filter_map(|kind| self.record_count(kind))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rigid_body(&self, id: i32) -> Option<&RigidBodyDescription> {
        self.rigid_bodies.iter().find(|rb| rb.id == id)
    }

    pub fn skeleton(&self, id: i32) -> Option<&SkeletonDescription> {
        self.skeletons.iter().find(|s| s.id == id)
    }
}

/// Stateless model-definition decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelDecoder {
    filter: AssetFilter,
}

impl ModelDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: AssetFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn decode_payload(&self, payload: &[u8]) -> Result<ModelDefinitions> {
        self.decode(&mut ByteCursor::new(payload))
    }

    /// Decode `dataset_count` tagged datasets.
    ///
    /// Unknown tags and filtered kinds are skipped by their size field and
    /// recorded in [`ModelDefinitions::skipped`]; they never abort decoding.
    pub fn decode(&self, cur: &mut ByteCursor<'_>) -> Result<ModelDefinitions> {
        let mut defs = ModelDefinitions::default();
        let dataset_count = cur.read_u32()?;

        for index in 0..dataset_count {
            let tag = cur.read_u32()?;
            let size = cur.read_u32()?;
            let start = cur.position();

            let kind = match AssetKind::from_description_tag(tag) {
                Some(kind) if self.filter.contains(kind) => kind,
                Some(kind) => {
                    trace!(%kind, size, "skipping filtered dataset");
                    cur.skip(size as usize)?;
                    defs.skipped.push(SkippedDataset {
                        tag,
                        size,
                        reason: SkipReason::Filtered,
                    });
                    continue;
                }
                None => {
                    warn!(
                        error = %WireError::UnknownDescriptionKind(tag),
                        index,
                        size,
                        "skipping dataset"
                    );
                    cur.skip(size as usize)?;
                    defs.skipped.push(SkippedDataset {
                        tag,
                        size,
                        reason: SkipReason::UnknownKind,
                    });
                    continue;
                }
            };

            Self::decode_dataset(kind, cur, &mut defs)?;

            let consumed = cur.position() - start;
            if consumed != size as usize {
                debug!(%kind, size, consumed, "dataset size field disagrees with decoded length");
            }
        }

        Ok(defs)
    }

    fn decode_dataset(
        kind: AssetKind,
        cur: &mut ByteCursor<'_>,
        defs: &mut ModelDefinitions,
    ) -> Result<()> {
        match kind {
            AssetKind::MarkerSet => defs.marker_sets.push(MarkerSetDescription::decode(cur)?),
            AssetKind::RigidBody => defs.rigid_bodies.push(RigidBodyDescription::decode(cur)?),
            AssetKind::Skeleton => defs.skeletons.push(SkeletonDescription::decode(cur)?),
            AssetKind::ForcePlate => defs.force_plates.push(ForcePlateDescription::decode(cur)?),
            AssetKind::Device => defs.devices.push(DeviceDescription::decode(cur)?),
            AssetKind::Camera => defs.cameras.push(CameraDescription::decode(cur)?),
            AssetKind::Asset => defs.assets.push(AssetDescription::decode(cur)?),
            other => return Err(WireError::UnknownAssetKind(other)),
        }
        Ok(())
    }
}

/// Decode a model-definition payload with every kind enabled.
pub fn decode_model_definitions(payload: &[u8]) -> Result<ModelDefinitions> {
    ModelDecoder::new().decode_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PayloadBuilder;

    fn marker_set_desc(name: &str, markers: &[&str]) -> Vec<u8> {
        let mut b = PayloadBuilder::new();
        b.cstring(name).u32(markers.len() as u32);
        for m in markers {
            b.cstring(m);
        }
        b.build()
    }

    fn rigid_body_desc(name: &str, id: i32, parent_id: i32, markers: &[(&str, i32)]) -> Vec<u8> {
        let mut b = PayloadBuilder::new();
        b.cstring(name)
            .i32(id)
            .i32(parent_id)
            .f32s(&[0.0, 0.1, 0.0])
            .u32(markers.len() as u32);
        for (i, _) in markers.iter().enumerate() {
            b.f32s(&[i as f32, 0.0, 0.0]);
        }
        for (_, label) in markers {
            b.i32(*label);
        }
        for (name, _) in markers {
            b.cstring(name);
        }
        b.build()
    }

    #[test]
    fn test_rigid_body_markers_assembled_from_arrays() {
        let body = rigid_body_desc("Wand", 3, -1, &[("m1", 11), ("m2", 12), ("m3", 13)]);
        let (rb, end) = RigidBodyDescription::decode_at(&body, 0).unwrap();

        assert_eq!(end, body.len());
        assert_eq!(rb.name, "Wand");
        assert_eq!(rb.id, 3);
        assert_eq!(rb.parent_id, -1);
        assert_eq!(rb.offset, Vec3::new(0.0, 0.1, 0.0));
        assert_eq!(rb.markers.len(), 3);
        assert_eq!(rb.markers[1].offset, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(rb.markers[1].active_label, 12);
        assert_eq!(rb.markers[2].name, "m3");
        assert_eq!(rb.owner, None);
    }

    #[test]
    fn test_unknown_kind_between_known_datasets_is_skipped() {
        let mut b = PayloadBuilder::new();
        b.u32(3)
            .dataset(0, &marker_set_desc("Body", &["a", "b"]))
            .dataset(42, &[0xAB; 13])
            .dataset(1, &rigid_body_desc("Wand", 1, -1, &[("m", 0)]));

        let defs = decode_model_definitions(&b.build()).unwrap();

        assert_eq!(defs.marker_sets.len(), 1);
        assert_eq!(defs.marker_sets[0].marker_names, vec!["a", "b"]);
        assert_eq!(defs.rigid_bodies.len(), 1);
        assert_eq!(defs.rigid_bodies[0].name, "Wand");
        assert_eq!(
            defs.skipped,
            vec![SkippedDataset {
                tag: 42,
                size: 13,
                reason: SkipReason::UnknownKind,
            }]
        );
        assert_eq!(defs.kinds(), vec![AssetKind::MarkerSet, AssetKind::RigidBody]);
        assert_eq!(defs.len(), 2);
    }

    #[test]
    fn test_filtered_dataset_skipped_by_size() {
        let mut b = PayloadBuilder::new();
        b.u32(2)
            .dataset(0, &marker_set_desc("Body", &["a"]))
            .dataset(1, &rigid_body_desc("Wand", 1, -1, &[]));

        let decoder =
            ModelDecoder::new().with_filter(AssetFilter::all().without(AssetKind::MarkerSet));
        let defs = decoder.decode_payload(&b.build()).unwrap();

        assert!(defs.marker_sets.is_empty());
        assert_eq!(defs.rigid_bodies.len(), 1);
        assert_eq!(defs.skipped[0].reason, SkipReason::Filtered);
        assert_eq!(defs.record_count(AssetKind::MarkerSet), Some(0));
        assert_eq!(defs.record_count(AssetKind::Suffix), None);
    }

    #[test]
    fn test_skeleton_bones_tagged_with_owner() {
        let mut body = PayloadBuilder::new();
        body.cstring("Actor")
            .i32(5)
            .u32(2)
            .bytes(&rigid_body_desc("Hip", 1, 0, &[]))
            .bytes(&rigid_body_desc("Spine", 2, 1, &[]));

        let mut b = PayloadBuilder::new();
        b.u32(1).dataset(2, &body.build());
        let defs = decode_model_definitions(&b.build()).unwrap();

        let skeleton = defs.skeleton(5).unwrap();
        assert_eq!(skeleton.name, "Actor");
        assert_eq!(skeleton.rigid_bodies[1].parent_id, 1);
        assert!(skeleton
            .rigid_bodies
            .iter()
            .all(|rb| rb.owner == Some(Owner::Skeleton(5))));
    }

    #[test]
    fn test_force_plate_description() {
        let mut body = PayloadBuilder::new();
        body.i32(1)
            .cstring("FP-0042")
            .f32(0.6)
            .f32(0.4)
            .f32s(&[0.0, 0.0, 0.01]);
        for i in 0..144 {
            body.f32(i as f32);
        }
        for i in 0..12 {
            body.f32(-(i as f32));
        }
        body.i32(2).i32(1).u32(3).cstring("Fx").cstring("Fy").cstring("Fz");

        let mut b = PayloadBuilder::new();
        b.u32(1).dataset(3, &body.build());
        let defs = decode_model_definitions(&b.build()).unwrap();

        let plate = &defs.force_plates[0];
        assert_eq!(plate.serial, "FP-0042");
        assert_eq!(plate.calibration_matrix[1][0], 12.0);
        assert_eq!(plate.calibration_matrix[11][11], 143.0);
        assert_eq!(plate.corners[3], [-9.0, -10.0, -11.0]);
        assert_eq!(plate.plate_type, 2);
        assert_eq!(plate.channel_names, vec!["Fx", "Fy", "Fz"]);
    }

    #[test]
    fn test_device_camera_and_asset_descriptions() {
        let mut device = PayloadBuilder::new();
        device
            .i32(8)
            .cstring("EMG")
            .cstring("SN-1")
            .i32(1)
            .i32(0)
            .u32(1)
            .cstring("ch0");

        let mut camera = PayloadBuilder::new();
        camera
            .cstring("Cam 1")
            .f32s(&[1.0, 2.0, 3.0])
            .f32s(&[1.0, 0.0, 0.0, 0.0]);

        let mut asset = PayloadBuilder::new();
        asset
            .cstring("Glove")
            .i32(1)
            .i32(20)
            .u32(1)
            .bytes(&rigid_body_desc("Palm", 21, 20, &[("p", 1)]))
            .u32(2)
            .cstring("thumb")
            .cstring("index");

        let mut b = PayloadBuilder::new();
        b.u32(3)
            .dataset(4, &device.build())
            .dataset(5, &camera.build())
            .dataset(6, &asset.build());
        let defs = decode_model_definitions(&b.build()).unwrap();

        assert_eq!(defs.devices[0].serial, "SN-1");
        assert_eq!(defs.devices[0].channel_names, vec!["ch0"]);
        assert_eq!(defs.cameras[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(defs.cameras[0].orientation, Quaternion::IDENTITY);

        let asset = &defs.assets[0];
        assert_eq!(asset.id, 20);
        assert_eq!(asset.rigid_bodies[0].owner, Some(Owner::Asset(20)));
        assert_eq!(asset.marker_names, vec!["thumb", "index"]);
        assert!(defs.skipped.is_empty());
    }

    #[test]
    fn test_concatenated_descriptions_by_relative_offset() {
        let mut buf = marker_set_desc("A", &["x"]);
        buf.extend(marker_set_desc("B", &[]));

        let (a, next) = MarkerSetDescription::decode_at(&buf, 0).unwrap();
        let (b, end) = MarkerSetDescription::decode_at(&buf, next).unwrap();
        assert_eq!(a.name, "A");
        assert_eq!(b.name, "B");
        assert!(b.marker_names.is_empty());
        assert_eq!(end, buf.len());
    }

    #[test]
    fn test_concatenated_variable_descriptions_by_relative_offset() {
        let mut buf = rigid_body_desc("Wand", 1, -1, &[("m1", 11), ("m2", 12)]);
        buf.extend(rigid_body_desc("Cap", 2, 1, &[("c", 21)]));
        let (a, next) = RigidBodyDescription::decode_at(&buf, 0).unwrap();
        let (b, end) = RigidBodyDescription::decode_at(&buf, next).unwrap();
        assert_eq!(a.markers.len(), 2);
        assert_eq!(b.name, "Cap");
        assert_eq!(b.parent_id, 1);
        assert_eq!(b.markers[0].active_label, 21);
        assert_eq!(b.markers[0].name, "c");
        assert_eq!(end, buf.len());

        let mut skeletons = PayloadBuilder::new();
        skeletons
            .cstring("Actor")
            .i32(5)
            .u32(1)
            .bytes(&rigid_body_desc("Hip", 1, 0, &[("h", 1)]))
            .cstring("Prop")
            .i32(6)
            .u32(2)
            .bytes(&rigid_body_desc("Base", 1, 0, &[]))
            .bytes(&rigid_body_desc("Tip", 2, 1, &[("t", 2)]));
        let buf = skeletons.build();
        let (a, next) = SkeletonDescription::decode_at(&buf, 0).unwrap();
        let (b, end) = SkeletonDescription::decode_at(&buf, next).unwrap();
        assert_eq!(a.rigid_bodies[0].owner, Some(Owner::Skeleton(5)));
        assert_eq!(b.name, "Prop");
        assert_eq!(b.rigid_bodies.len(), 2);
        assert_eq!(b.rigid_bodies[1].name, "Tip");
        assert_eq!(b.rigid_bodies[1].owner, Some(Owner::Skeleton(6)));
        assert_eq!(end, buf.len());

        let mut plates = PayloadBuilder::new();
        for (id, serial, channels) in [(1, "FP-1", &["Fx", "Fy"][..]), (2, "FP-22", &["Mz"][..])] {
            plates
                .i32(id)
                .cstring(serial)
                .f32(0.6)
                .f32(0.4)
                .f32s(&[0.0, 0.0, 0.0]);
            for i in 0..(144 + 12) {
                plates.f32(id as f32 * i as f32);
            }
            plates.i32(2).i32(1).u32(channels.len() as u32);
            for name in channels {
                plates.cstring(name);
            }
        }
        let buf = plates.build();
        let (a, next) = ForcePlateDescription::decode_at(&buf, 0).unwrap();
        let (b, end) = ForcePlateDescription::decode_at(&buf, next).unwrap();
        assert_eq!(a.channel_names, vec!["Fx", "Fy"]);
        assert_eq!(b.id, 2);
        assert_eq!(b.serial, "FP-22");
        assert_eq!(b.calibration_matrix[0][1], 2.0);
        assert_eq!(b.corners[3][2], 310.0);
        assert_eq!(b.channel_names, vec!["Mz"]);
        assert_eq!(end, buf.len());

        let mut assets = PayloadBuilder::new();
        assets
            .cstring("Glove")
            .i32(1)
            .i32(20)
            .u32(1)
            .bytes(&rigid_body_desc("Palm", 21, 20, &[("p", 1)]))
            .u32(1)
            .cstring("thumb")
            .cstring("Sock")
            .i32(1)
            .i32(30)
            .u32(0)
            .u32(2)
            .cstring("heel")
            .cstring("toe");
        let buf = assets.build();
        let (a, next) = AssetDescription::decode_at(&buf, 0).unwrap();
        let (b, end) = AssetDescription::decode_at(&buf, next).unwrap();
        assert_eq!(a.rigid_bodies[0].owner, Some(Owner::Asset(20)));
        assert_eq!(b.name, "Sock");
        assert_eq!(b.id, 30);
        assert!(b.rigid_bodies.is_empty());
        assert_eq!(b.marker_names, vec!["heel", "toe"]);
        assert_eq!(end, buf.len());
    }

    #[test]
    fn test_truncated_dataset_is_error() {
        let mut body = marker_set_desc("Body", &["a", "b"]);
        body.truncate(body.len() - 2);
        let mut b = PayloadBuilder::new();
        b.u32(1).dataset(0, &body);

        assert!(matches!(
            decode_model_definitions(&b.build()),
            Err(WireError::TruncatedString { .. })
        ));
    }

    #[test]
    fn test_empty_definitions() {
        let defs = decode_model_definitions(&0u32.to_le_bytes()).unwrap();
        assert!(defs.is_empty());
        assert!(defs.kinds().is_empty());
    }
}
