use crate::asset::AssetKind;
use crate::version::ProtocolVersion;

/// Errors that can occur while encoding or decoding NatNet messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// A fixed-width read ran past the end of the payload.
    #[error("buffer underrun at offset {position}: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun {
        needed: usize,
        remaining: usize,
        position: usize,
    },

    /// A NUL-terminated string had no terminator before the end of the payload.
    #[error("unterminated string starting at offset {position}")]
    TruncatedString { position: usize },

    /// The envelope carried a message kind this client does not know.
    #[error("unknown message kind {0}")]
    UnknownMessageKind(u16),

    /// The frame dispatch sequence named a kind with no frame decoder.
    #[error("no frame decoder for asset kind {0}")]
    UnknownAssetKind(AssetKind),

    /// A model-definition dataset carried an unknown kind tag.
    #[error("unknown description kind tag {0}")]
    UnknownDescriptionKind(u32),

    /// No frame layout exists for the negotiated stream version.
    #[error("unsupported NatNet stream version {0}")]
    UnsupportedVersion(ProtocolVersion),

    /// Version text could not be parsed.
    #[error("invalid version string '{0}'")]
    InvalidVersion(String),

    /// The payload does not fit in the 16-bit envelope length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A payload decoder was handed an envelope of the wrong kind.
    #[error("expected {expected} message, got {actual}")]
    UnexpectedMessage {
        expected: &'static str,
        actual: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, WireError>;
