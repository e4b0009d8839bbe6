use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use natnet_transport::{open_command_socket, open_data_socket, NatNetSocket, TransportError};
use natnet_wire::{AssetFilter, MessageKind, ProtocolVersion};
use tracing::{debug, info, warn};

use crate::command::CommandSender;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::listener::SessionListener;
use crate::receiver::{KeepAlive, ReceiveLoop, Shared};
use crate::state::{BitstreamVerdict, SessionPhase, SessionState};

/// Handles owned while the receive loops run.
struct Running {
    commands: CommandSender,
    command_socket: NatNetSocket,
    data_socket: NatNetSocket,
    command_loop: JoinHandle<Result<()>>,
    data_loop: JoinHandle<Result<()>>,
}

/// A NatNet client session.
///
/// Owns the command and data sockets and the two receive loops reading
/// them. Decoded traffic is delivered to the [`SessionListener`] given at
/// construction; negotiation state can be read at any time.
pub struct Session {
    config: SessionConfig,
    shared: Arc<Shared>,
    listener: Arc<dyn SessionListener>,
    running: Option<Running>,
}

impl Session {
    pub fn new(config: SessionConfig, listener: impl SessionListener) -> Self {
        Self::with_listener(config, Arc::new(listener))
    }

    /// Create a session around a listener that is shared elsewhere.
    pub fn with_listener(config: SessionConfig, listener: Arc<dyn SessionListener>) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
            listener,
            running: None,
        }
    }

    /// Open both sockets, start the receive loops and send the initial
    /// Connect, RequestFrameOfData and RequestModelDef requests.
    pub fn startup(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(SessionError::AlreadyStarted);
        }

        let transport = self.config.transport();
        let command_socket = open_command_socket(&transport)?;
        let data_socket = open_data_socket(&transport)?;

        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.update(SessionState::begin_connect);

        let endpoint = self.config.command_endpoint();
        let commands = CommandSender::new(command_socket.try_clone()?, endpoint);
        let keep_alive = if self.config.use_multicast {
            None
        } else {
            Some(KeepAlive {
                sender: CommandSender::new(command_socket.try_clone()?, endpoint),
                interval: self.config.keep_alive_interval,
            })
        };

        let command_loop = self.spawn_loop(command_socket.try_clone()?, keep_alive)?;
        let data_loop = match self.spawn_loop(data_socket.try_clone()?, None) {
            Ok(handle) => handle,
            Err(err) => {
                self.shared.stop.store(true, Ordering::SeqCst);
                command_socket.shutdown();
                let _ = command_loop.join();
                self.shared.update(SessionState::finish);
                return Err(err);
            }
        };

        self.running = Some(Running {
            commands,
            command_socket,
            data_socket,
            command_loop,
            data_loop,
        });
        info!(
            server = %endpoint,
            multicast = self.config.use_multicast,
            "session started"
        );

        let connect = self.commands()?.send_connect(self.config.connect_version);
        if let Err(err) = connect {
            warn!(error = %err, "connect request failed");
            let _ = self.shutdown();
            return Err(err);
        }
        for kind in [MessageKind::RequestFrameOfData, MessageKind::RequestModelDef] {
            if let Err(err) = self.commands()?.send_bare(kind) {
                warn!(request = %kind, error = %err, "initial request failed");
            }
        }
        Ok(())
    }

    fn spawn_loop(
        &self,
        socket: NatNetSocket,
        keep_alive: Option<KeepAlive>,
    ) -> Result<JoinHandle<Result<()>>> {
        let name = format!("natnet-{}", socket.role());
        let receive_loop = ReceiveLoop {
            socket,
            shared: Arc::clone(&self.shared),
            listener: Arc::clone(&self.listener),
            filter: self.config.filter,
            use_multicast: self.config.use_multicast,
            keep_alive,
        };
        thread::Builder::new()
            .name(name)
            .spawn(move || receive_loop.run())
            .map_err(|err| SessionError::Transport(TransportError::Io(err)))
    }

    /// Stop both loops and close the sockets.
    ///
    /// Idempotent. Returns the first error either loop ended with.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        self.shared.stop.store(true, Ordering::SeqCst);
        running.command_socket.shutdown();
        running.data_socket.shutdown();

        let command = join_loop(running.command_loop, "command");
        let data = join_loop(running.data_loop, "data");
        drop(running.commands);

        self.shared.update(SessionState::finish);
        info!("session stopped");
        command.and(data)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// True when both sockets are open and the server has answered Connect.
    pub fn is_connected(&self) -> bool {
        let sockets_open = self.running.as_ref().is_some_and(|running| {
            !running.command_socket.is_closed() && !running.data_socket.is_closed()
        });
        sockets_open && self.shared.state().server_info_received()
    }

    /// Block until the first ServerInfo arrives.
    pub fn wait_for_server_info(&self, timeout: Duration) -> Result<SessionState> {
        if self.running.is_none() {
            return Err(SessionError::NotStarted);
        }
        let guard = self.shared.state();
        let (guard, wait) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |state| !state.server_info_received())
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if wait.timed_out() && !guard.server_info_received() {
            return Err(SessionError::ResponseTimeout(timeout));
        }
        Ok(guard.clone())
    }

    /// Ask the server to stream a different bitstream version.
    ///
    /// Waits up to `response_timeout` for the verdict. On acceptance the
    /// playback reset sequence is sent before returning. A late acceptance
    /// after a timeout is still applied by the command loop.
    pub fn set_bitstream_version(&self, version: ProtocolVersion) -> Result<()> {
        let commands = self.commands()?;
        {
            let mut state = self.shared.state();
            state.check_bitstream_change(version)?;
            state.begin_bitstream(version);
        }

        let command = format!("Bitstream {}.{}", version.major, version.minor);
        if let Err(err) = commands.send_command(&command) {
            self.shared.update(SessionState::abandon_bitstream);
            return Err(err);
        }

        let timeout = self.config.response_timeout;
        let verdict = {
            let guard = self.shared.state();
            let (mut guard, _) = self
                .shared
                .changed
                .wait_timeout_while(guard, timeout, |state| {
                    state
                        .pending_bitstream
                        .as_ref()
                        .is_some_and(|pending| pending.verdict.is_none())
                })
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            guard.take_verdict()
        };

        match verdict {
            Some(BitstreamVerdict::Accepted(version)) => {
                debug!(%version, "resetting playback after bitstream change");
                commands.send_playback_reset(self.config.resync_delay, self.config.settle_delay);
                Ok(())
            }
            Some(BitstreamVerdict::Rejected(reason)) => {
                warn!(%version, %reason, "bitstream change rejected");
                Err(SessionError::BitstreamChangeRejected(reason))
            }
            None => {
                warn!(?timeout, %version, "no bitstream verdict from server");
                Err(SessionError::ResponseTimeout(timeout))
            }
        }
    }

    /// Query the server's stream version with a bare `Bitstream` request.
    pub fn refresh_configuration(&self) -> Result<usize> {
        self.send_command("Bitstream")
    }

    pub fn request_model_definitions(&self) -> Result<usize> {
        self.commands()?.send_bare(MessageKind::RequestModelDef)
    }

    pub fn request_frame_of_data(&self) -> Result<usize> {
        self.commands()?.send_bare(MessageKind::RequestFrameOfData)
    }

    /// Send a text command such as `TimelinePlay`.
    pub fn send_command(&self, command: &str) -> Result<usize> {
        self.commands()?.send_command(command)
    }

    fn commands(&self) -> Result<&CommandSender> {
        self.running
            .as_ref()
            .map(|running| &running.commands)
            .ok_or(SessionError::NotStarted)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot of the negotiation state.
    pub fn state(&self) -> SessionState {
        self.shared.state().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.shared.state().phase()
    }

    pub fn requested_version(&self) -> ProtocolVersion {
        self.shared.state().requested_version()
    }

    pub fn server_stream_version(&self) -> ProtocolVersion {
        self.shared.state().server_stream_version()
    }

    pub fn server_version(&self) -> ProtocolVersion {
        self.shared.state().server_version()
    }

    pub fn application_name(&self) -> Option<String> {
        self.shared.state().application_name().map(str::to_string)
    }

    pub fn can_change_bitstream(&self) -> bool {
        self.shared.state().can_change_bitstream()
    }

    pub fn is_locked(&self) -> bool {
        self.shared.state().is_locked()
    }

    // Setters are ignored while the session runs.
    fn configure(&mut self, setting: &'static str, apply: impl FnOnce(&mut SessionConfig)) {
        if self.is_locked() {
            debug!(setting, "configuration locked, change ignored");
            return;
        }
        apply(&mut self.config);
    }

    pub fn set_server_address(&mut self, addr: Ipv4Addr) {
        self.configure("server_address", |c| c.server_address = addr);
    }

    pub fn set_local_address(&mut self, addr: Ipv4Addr) {
        self.configure("local_address", |c| c.local_address = addr);
    }

    pub fn set_multicast_address(&mut self, addr: Ipv4Addr) {
        self.configure("multicast_address", |c| c.multicast_address = addr);
    }

    pub fn set_command_port(&mut self, port: u16) {
        self.configure("command_port", |c| c.command_port = port);
    }

    pub fn set_data_port(&mut self, port: u16) {
        self.configure("data_port", |c| c.data_port = port);
    }

    pub fn set_use_multicast(&mut self, enabled: bool) {
        self.configure("use_multicast", |c| c.use_multicast = enabled);
    }

    pub fn set_filter(&mut self, filter: AssetFilter) {
        self.configure("filter", |c| c.filter = filter);
    }
}

fn join_loop(handle: JoinHandle<Result<()>>, name: &'static str) -> Result<()> {
    handle
        .join()
        .map_err(|_| SessionError::LoopPanicked(name))?
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(error = %err, "session shutdown on drop failed");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .field("running", &self.running.is_some())
            .finish_non_exhaustive()
    }
}
