use std::net::Ipv4Addr;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use natnet_session::{Session, SessionConfig, SessionEvent, DEFAULT_COMMAND_PORT};
use natnet_transport::{DEFAULT_DATA_PORT, DEFAULT_MULTICAST_ADDRESS};
use natnet_wire::{AssetFilter, AssetKind};

use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bitstream;
pub mod describe;
pub mod info;
pub mod send;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream and print frames of data.
    Stream(StreamArgs),
    /// Request and print model definitions.
    Describe(DescribeArgs),
    /// Connect and print the server's handshake reply.
    Info(InfoArgs),
    /// Send a text command and print the response.
    Send(SendArgs),
    /// Ask the server to switch bitstream version (unicast only).
    Bitstream(BitstreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, format),
        Command::Describe(args) => describe::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Bitstream(args) => bitstream::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the server is and how to reach it.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Server address.
    #[arg(long, env = "NATNET_SERVER", default_value_t = Ipv4Addr::LOCALHOST)]
    pub server: Ipv4Addr,
    /// Local interface address.
    #[arg(long, env = "NATNET_LOCAL", default_value_t = Ipv4Addr::LOCALHOST)]
    pub local: Ipv4Addr,
    /// Multicast group for frame data.
    #[arg(long, default_value_t = DEFAULT_MULTICAST_ADDRESS)]
    pub multicast_address: Ipv4Addr,
    /// Server command port.
    #[arg(long, default_value_t = DEFAULT_COMMAND_PORT)]
    pub command_port: u16,
    /// Server data port.
    #[arg(long, default_value_t = DEFAULT_DATA_PORT)]
    pub data_port: u16,
    /// Use unicast instead of multicast.
    #[arg(long)]
    pub unicast: bool,
    /// Time to wait for the server (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl ConnectArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        Ok(SessionConfig::default()
            .with_server_address(self.server)
            .with_local_address(self.local)
            .with_multicast_address(self.multicast_address)
            .with_command_port(self.command_port)
            .with_data_port(self.data_port)
            .with_multicast(!self.unicast)
            .with_response_timeout(self.timeout()?))
    }

    pub fn timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.timeout)
    }
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Decode only these kinds (comma-separated, e.g. rigid_body,skeleton).
    #[arg(long, value_delimiter = ',')]
    pub kinds: Option<Vec<AssetKind>>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Command text, e.g. TimelinePlay.
    pub command: String,
    /// Do not wait for the response.
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Args, Debug)]
pub struct BitstreamArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Target version, e.g. 3.1.
    pub version: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Start a session and wait for the server's ServerInfo reply.
pub fn connect(
    args: &ConnectArgs,
    filter: AssetFilter,
) -> CliResult<(Session, Receiver<SessionEvent>)> {
    let config = args.session_config()?.with_filter(filter);
    let timeout = args.timeout()?;
    let (tx, rx) = mpsc::channel();

    let mut session = Session::new(config, tx);
    session
        .startup()
        .map_err(|err| session_error("startup failed", err))?;
    session
        .wait_for_server_info(timeout)
        .map_err(|err| session_error("no reply from server", err))?;
    Ok((session, rx))
}

/// First event `pick` accepts within `timeout`.
pub fn wait_for_event<T>(
    events: &Receiver<SessionEvent>,
    timeout: Duration,
    mut pick: impl FnMut(SessionEvent) -> Option<T>,
) -> Option<T> {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.checked_duration_since(Instant::now())?;
        let event = events.recv_timeout(left).ok()?;
        if let Some(found) = pick(event) {
            return Some(found);
        }
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
