use std::fmt;
use std::str::FromStr;

/// Every record kind that can appear in a frame or model-definition payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AssetKind {
    Prefix,
    MarkerSet,
    LegacyMarkerSet,
    RigidBody,
    Skeleton,
    Asset,
    LabeledMarker,
    ForcePlate,
    Device,
    Camera,
    Suffix,
}

impl AssetKind {
    pub const ALL: [AssetKind; 11] = [
        AssetKind::Prefix,
        AssetKind::MarkerSet,
        AssetKind::LegacyMarkerSet,
        AssetKind::RigidBody,
        AssetKind::Skeleton,
        AssetKind::Asset,
        AssetKind::LabeledMarker,
        AssetKind::ForcePlate,
        AssetKind::Device,
        AssetKind::Camera,
        AssetKind::Suffix,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AssetKind::Prefix => "prefix",
            AssetKind::MarkerSet => "marker_set",
            AssetKind::LegacyMarkerSet => "legacy_marker_set",
            AssetKind::RigidBody => "rigid_body",
            AssetKind::Skeleton => "skeleton",
            AssetKind::Asset => "asset",
            AssetKind::LabeledMarker => "labeled_marker",
            AssetKind::ForcePlate => "force_plate",
            AssetKind::Device => "device",
            AssetKind::Camera => "camera",
            AssetKind::Suffix => "suffix",
        }
    }

    /// The dataset tag used for this kind in model-definition payloads.
    pub fn description_tag(self) -> Option<u32> {
        match self {
            AssetKind::MarkerSet => Some(0),
            AssetKind::RigidBody => Some(1),
            AssetKind::Skeleton => Some(2),
            AssetKind::ForcePlate => Some(3),
            AssetKind::Device => Some(4),
            AssetKind::Camera => Some(5),
            AssetKind::Asset => Some(6),
            _ => None,
        }
    }

    pub fn from_description_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(AssetKind::MarkerSet),
            1 => Some(AssetKind::RigidBody),
            2 => Some(AssetKind::Skeleton),
            3 => Some(AssetKind::ForcePlate),
            4 => Some(AssetKind::Device),
            5 => Some(AssetKind::Camera),
            6 => Some(AssetKind::Asset),
            _ => None,
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        AssetKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| format!("unknown asset kind '{s}'"))
    }
}

/// Parent of a nested record, so flattened output stays traceable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Owner {
    Skeleton(i32),
    Asset(i32),
}

impl Owner {
    pub fn id(self) -> i32 {
        match self {
            Owner::Skeleton(id) | Owner::Asset(id) => id,
        }
    }
}

/// Which asset kinds the decoders materialize.
///
/// Disabled kinds are skipped using the advisory byte-size field (frames)
/// or the dataset size field (model definitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetFilter {
    mask: u16,
}

impl AssetFilter {
    pub fn all() -> Self {
        let mask = AssetKind::ALL.iter().fold(0, |mask, kind| mask | kind.bit());
        Self { mask }
    }

    pub fn none() -> Self {
        Self { mask: 0 }
    }

    pub fn only(kinds: &[AssetKind]) -> Self {
        kinds.iter().fold(Self::none(), |filter, &kind| filter.with(kind))
    }

    pub fn with(mut self, kind: AssetKind) -> Self {
        self.mask |= kind.bit();
        self
    }

    pub fn without(mut self, kind: AssetKind) -> Self {
        self.mask &= !kind.bit();
        self
    }

    pub fn contains(&self, kind: AssetKind) -> bool {
        self.mask & kind.bit() != 0
    }

    /// Enabled kinds in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = AssetKind> + '_ {
        AssetKind::ALL.into_iter().filter(|kind| self.contains(*kind))
    }
}

impl Default for AssetFilter {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_tags_roundtrip_for_described_kinds() {
        for kind in AssetKind::ALL {
            if let Some(tag) = kind.description_tag() {
                assert_eq!(AssetKind::from_description_tag(tag), Some(kind));
            }
        }
        assert_eq!(AssetKind::from_description_tag(6), Some(AssetKind::Asset));
        assert_eq!(AssetKind::from_description_tag(7), None);
        assert_eq!(AssetKind::Suffix.description_tag(), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("rigid_body".parse::<AssetKind>(), Ok(AssetKind::RigidBody));
        assert_eq!("Force-Plate".parse::<AssetKind>(), Ok(AssetKind::ForcePlate));
        assert!("bone".parse::<AssetKind>().is_err());
    }

    #[test]
    fn test_filter_defaults_to_everything() {
        let filter = AssetFilter::default();
        assert!(AssetKind::ALL.iter().all(|kind| filter.contains(*kind)));
        assert_eq!(filter.kinds().count(), AssetKind::ALL.len());
    }

    #[test]
    fn test_filter_toggles() {
        let filter = AssetFilter::all().without(AssetKind::Skeleton);
        assert!(!filter.contains(AssetKind::Skeleton));
        assert!(filter.contains(AssetKind::RigidBody));

        let only = AssetFilter::only(&[AssetKind::Prefix, AssetKind::RigidBody]);
        assert_eq!(
            only.kinds().collect::<Vec<_>>(),
            vec![AssetKind::Prefix, AssetKind::RigidBody]
        );
        assert!(!AssetFilter::none().contains(AssetKind::Prefix));
    }
}
