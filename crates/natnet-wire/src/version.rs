use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WireError};

/// A NatNet version quad, ordered lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub revision: u8,
}

impl ProtocolVersion {
    /// The "not yet negotiated" version.
    pub const UNSET: Self = Self::new(0, 0);

    /// Version requested in the Connect handshake by default.
    pub const DEFAULT_CONNECT: Self = Self::from_quad([4, 1, 0, 0]);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self {
            major,
            minor,
            build: 0,
            revision: 0,
        }
    }

    pub const fn from_quad(quad: [u8; 4]) -> Self {
        Self {
            major: quad[0],
            minor: quad[1],
            build: quad[2],
            revision: quad[3],
        }
    }

    pub const fn to_quad(self) -> [u8; 4] {
        [self.major, self.minor, self.build, self.revision]
    }

    /// True until the first server contact has filled the version in.
    pub fn is_unset(&self) -> bool {
        self.major == 0 && self.minor == 0
    }

    /// Whether two versions select the same bitstream (major and minor agree).
    pub fn same_stream(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor
    }

    /// Parse the `X.Y` tail of a `Bitstream,X.Y` command response.
    pub fn from_bitstream_reply(text: &str) -> Option<Self> {
        let mut parts = text.trim_end_matches('\0').splitn(2, ',');
        if parts.next()?.trim() != "Bitstream" {
            return None;
        }
        parts.next()?.trim().parse().ok()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for ProtocolVersion {
    type Err = WireError;

    /// Accepts one to four dot-separated components; missing ones are zero.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || WireError::InvalidVersion(s.to_string());
        let mut quad = [0u8; 4];
        let mut count = 0;
        for part in s.trim().split('.') {
            if count == quad.len() {
                return Err(invalid());
            }
            quad[count] = part.trim().parse().map_err(|_| invalid())?;
            count += 1;
        }
        Ok(Self::from_quad(quad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_minor() {
        let v: ProtocolVersion = "4.1".parse().unwrap();
        assert_eq!(v, ProtocolVersion::new(4, 1));
        assert_eq!(v.to_string(), "4.1.0.0");
    }

    #[test]
    fn test_parse_full_quad() {
        let v: ProtocolVersion = "3.1.2.7".parse().unwrap();
        assert_eq!(v.to_quad(), [3, 1, 2, 7]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<ProtocolVersion>().is_err());
        assert!("four.one".parse::<ProtocolVersion>().is_err());
        assert!("1.2.3.4.5".parse::<ProtocolVersion>().is_err());
        assert!("4.300".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(ProtocolVersion::new(4, 0) < ProtocolVersion::new(4, 1));
        assert!(ProtocolVersion::new(3, 9) < ProtocolVersion::new(4, 0));
        assert!(ProtocolVersion::from_quad([4, 1, 0, 1]) > ProtocolVersion::new(4, 1));
    }

    #[test]
    fn test_unset_and_same_stream() {
        assert!(ProtocolVersion::UNSET.is_unset());
        assert!(ProtocolVersion::from_quad([0, 0, 3, 0]).is_unset());
        assert!(!ProtocolVersion::DEFAULT_CONNECT.is_unset());
        assert!(ProtocolVersion::from_quad([4, 1, 0, 0])
            .same_stream(&ProtocolVersion::from_quad([4, 1, 2, 0])));
        assert!(!ProtocolVersion::new(4, 1).same_stream(&ProtocolVersion::new(4, 0)));
    }

    #[test]
    fn test_bitstream_reply() {
        assert_eq!(
            ProtocolVersion::from_bitstream_reply("Bitstream,4.0"),
            Some(ProtocolVersion::new(4, 0))
        );
        assert_eq!(
            ProtocolVersion::from_bitstream_reply("Bitstream,3.1.0.0\0"),
            Some(ProtocolVersion::new(3, 1))
        );
        assert_eq!(ProtocolVersion::from_bitstream_reply("Bitstream"), None);
        assert_eq!(ProtocolVersion::from_bitstream_reply("OK,4.0"), None);
    }
}
