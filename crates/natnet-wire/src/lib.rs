//! NatNet wire format: message envelopes and payload decoders.
//!
//! Every NatNet datagram is a 4-byte envelope followed by a payload:
//! - A 2-byte little-endian message kind
//! - A 2-byte little-endian payload length
//!
//! Frame-of-data and model-definition payloads are decoded into typed,
//! owned aggregates by stateless decoders, so the same bytes always produce
//! the same result.

pub mod asset;
pub mod cursor;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod message;
pub mod model;
pub mod record;
pub mod version;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use asset::{AssetFilter, AssetKind, Owner};
pub use cursor::ByteCursor;
pub use envelope::{
    decode_message, encode_message, peek_kind, Message, MessageHeader, MessageKind, HEADER_SIZE,
    MAX_DATAGRAM_SIZE, MAX_PAYLOAD,
};
pub use error::{Result, WireError};
pub use frame::{
    decode_frame, marker_flags, AnalogChannel, Asset, AssetMarker, AssetRigidBody, Device,
    ForcePlate, FrameDecoder, FrameLayout, FrameOfData, FramePrefix, FrameSuffix, LabeledMarker,
    MarkerSet, RigidBody, Skeleton,
};
pub use message::{
    decode_text, encode_bare, encode_command, encode_connect, CommandResponse, ConnectionInfo,
    ServerInfo, CONNECT_PADDING, CONNECT_PAYLOAD_SIZE, CONNECT_VERSION_OFFSET,
};
pub use model::{
    decode_model_definitions, AssetDescription, CameraDescription, DeviceDescription,
    ForcePlateDescription, MarkerSetDescription, ModelDecoder, ModelDefinitions,
    RigidBodyDescription, RigidBodyMarkerDescription, SkeletonDescription, SkipReason,
    SkippedDataset,
};
pub use record::{KindHeader, Quaternion, Vec3, WireRecord};
pub use version::ProtocolVersion;
