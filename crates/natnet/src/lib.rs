//! NatNet motion-capture streaming client.
//!
//! natnet receives real-time rigid body, skeleton, marker and analog data
//! from a NatNet server over UDP.
//!
//! # Crate Structure
//!
//! - [`transport`]: UDP command and data sockets, unicast or multicast
//! - [`wire`]: message envelopes, frame and model-definition decoders
//! - [`session`]: connection state machine and receive loops (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use natnet_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use natnet_wire::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use natnet_session::*;
}
