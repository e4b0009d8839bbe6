//! Connection and version-negotiation state.
//!
//! Transitions are plain methods on [`SessionState`] so they can be tested
//! without sockets. The session keeps one instance behind a mutex; the
//! command loop applies server messages and the owner only reads.

use std::fmt;

use natnet_wire::{CommandResponse, ConnectionInfo, ProtocolVersion, ServerInfo};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    #[default]
    Disconnected,
    /// Connect sent, waiting for ServerInfo.
    Connecting,
    /// A bitstream change is waiting for the server's verdict.
    Negotiating,
    Active,
}

impl SessionPhase {
    pub fn name(self) -> &'static str {
        match self {
            SessionPhase::Disconnected => "disconnected",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Negotiating => "negotiating",
            SessionPhase::Active => "active",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a bitstream change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitstreamVerdict {
    Accepted(ProtocolVersion),
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingBitstream {
    pub(crate) requested: ProtocolVersion,
    pub(crate) verdict: Option<BitstreamVerdict>,
}

/// Negotiated state of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) phase: SessionPhase,
    pub(crate) requested_version: ProtocolVersion,
    pub(crate) server_stream_version: ProtocolVersion,
    pub(crate) server_version: ProtocolVersion,
    pub(crate) application_name: Option<String>,
    pub(crate) connection: Option<ConnectionInfo>,
    pub(crate) is_locked: bool,
    pub(crate) can_change_bitstream: bool,
    pub(crate) server_info_received: bool,
    pub(crate) pending_bitstream: Option<PendingBitstream>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Version this client decodes with. Unset until first contact.
    pub fn requested_version(&self) -> ProtocolVersion {
        self.requested_version
    }

    pub fn server_stream_version(&self) -> ProtocolVersion {
        self.server_stream_version
    }

    pub fn server_version(&self) -> ProtocolVersion {
        self.server_version
    }

    pub fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    pub fn connection(&self) -> Option<&ConnectionInfo> {
        self.connection.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn can_change_bitstream(&self) -> bool {
        self.can_change_bitstream
    }

    pub fn server_info_received(&self) -> bool {
        self.server_info_received
    }

    /// Start a fresh connection attempt and lock the configuration.
    pub(crate) fn begin_connect(&mut self) {
        *self = Self {
            phase: SessionPhase::Connecting,
            is_locked: true,
            ..Self::default()
        };
    }

    /// Apply a ServerInfo reply. Returns true on first contact.
    pub(crate) fn apply_server_info(&mut self, info: &ServerInfo, use_multicast: bool) -> bool {
        self.application_name = Some(info.application_name.clone());
        self.server_version = info.server_version;
        self.server_stream_version = info.stream_version;
        self.connection = info.connection;
        self.server_info_received = true;

        let first_contact = self.requested_version.is_unset();
        if first_contact {
            self.requested_version = info.stream_version;
            self.can_change_bitstream = info.server_version.major >= 4 && !use_multicast;
            info!(
                application = %info.application_name,
                server_version = %info.server_version,
                stream_version = %info.stream_version,
                can_change_bitstream = self.can_change_bitstream,
                "server contact established"
            );
        } else {
            debug!(stream_version = %info.stream_version, "repeated server info");
        }

        self.phase = if self.awaiting_verdict() {
            SessionPhase::Negotiating
        } else {
            SessionPhase::Active
        };
        first_contact
    }

    fn awaiting_verdict(&self) -> bool {
        self.pending_bitstream
            .as_ref()
            .is_some_and(|pending| pending.verdict.is_none())
    }

    /// Leave `Negotiating` once the pending change is settled or dropped.
    fn settle_phase(&mut self) {
        if self.phase == SessionPhase::Negotiating && !self.awaiting_verdict() {
            self.phase = SessionPhase::Active;
        }
    }

    /// Check that a bitstream change to `version` may be requested.
    pub(crate) fn check_bitstream_change(&self, version: ProtocolVersion) -> Result<()> {
        if !self.can_change_bitstream {
            return Err(SessionError::BitstreamChangeRejected(
                "server does not allow bitstream changes on this connection".to_string(),
            ));
        }
        if version.same_stream(&self.requested_version) {
            return Err(SessionError::BitstreamChangeRejected(format!(
                "already streaming {}.{}",
                version.major, version.minor
            )));
        }
        Ok(())
    }

    pub(crate) fn begin_bitstream(&mut self, version: ProtocolVersion) {
        self.pending_bitstream = Some(PendingBitstream {
            requested: version,
            verdict: None,
        });
        if self.phase == SessionPhase::Active {
            self.phase = SessionPhase::Negotiating;
        }
    }

    /// Drop a pending change whose request never reached the server.
    pub(crate) fn abandon_bitstream(&mut self) {
        self.pending_bitstream = None;
        self.settle_phase();
    }

    /// Apply a command response. Returns the verdict if it settled a
    /// pending bitstream change.
    ///
    /// A `Bitstream,X.Y` reply only accepts when `X.Y` is the requested
    /// stream; any other reported version leaves the request pending.
    pub(crate) fn apply_response(&mut self, response: &CommandResponse) -> Option<BitstreamVerdict> {
        let reported = response.bitstream_version();
        if let Some(version) = reported {
            self.server_stream_version = version;
        }

        let pending = self
            .pending_bitstream
            .as_mut()
            .filter(|pending| pending.verdict.is_none())?;

        let verdict = match response {
            CommandResponse::Code(0) => BitstreamVerdict::Accepted(pending.requested),
            CommandResponse::Code(code) => {
                BitstreamVerdict::Rejected(format!("server returned code {code}"))
            }
            CommandResponse::Text(_) => match reported {
                Some(version) if version.same_stream(&pending.requested) => {
                    BitstreamVerdict::Accepted(pending.requested)
                }
                Some(version) => {
                    debug!(
                        %version,
                        requested = %pending.requested,
                        "bitstream reply for another version"
                    );
                    return None;
                }
                None => return None,
            },
        };

        match &verdict {
            BitstreamVerdict::Accepted(version) => {
                self.requested_version = *version;
                info!(version = %version, "bitstream change accepted");
            }
            BitstreamVerdict::Rejected(reason) => {
                warn!(reason = %reason, "bitstream change rejected");
            }
        }
        pending.verdict = Some(verdict.clone());
        self.settle_phase();
        Some(verdict)
    }

    /// The server did not recognize the last request.
    pub(crate) fn apply_unrecognized(&mut self) -> Option<BitstreamVerdict> {
        let pending = self
            .pending_bitstream
            .as_mut()
            .filter(|pending| pending.verdict.is_none())?;
        let verdict = BitstreamVerdict::Rejected("server did not recognize the request".into());
        warn!("bitstream change rejected: unrecognized request");
        pending.verdict = Some(verdict.clone());
        self.settle_phase();
        Some(verdict)
    }

    /// Remove and return a settled verdict.
    pub(crate) fn take_verdict(&mut self) -> Option<BitstreamVerdict> {
        let verdict = self.pending_bitstream.as_ref()?.verdict.clone()?;
        self.pending_bitstream = None;
        Some(verdict)
    }

    pub(crate) fn apply_disconnect(&mut self) {
        info!("server disconnected");
        self.phase = SessionPhase::Disconnected;
    }

    /// Tear down after shutdown; unlocks the configuration.
    pub(crate) fn finish(&mut self) {
        self.phase = SessionPhase::Disconnected;
        self.is_locked = false;
        self.pending_bitstream = None;
    }
}
