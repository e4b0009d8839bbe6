//! End-to-end session tests against a fake NatNet server on loopback.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use natnet_session::{Session, SessionConfig, SessionError, SessionEvent, SessionPhase};
use natnet_transport::SocketRole;
use natnet_wire::testing::{rigid_body_record, server_info_payload, suffix_record, PayloadBuilder};
use natnet_wire::{decode_message, decode_text, MessageKind, ProtocolVersion};

const WAIT: Duration = Duration::from_secs(3);

struct FakeServer {
    socket: UdpSocket,
    client: Option<SocketAddr>,
}

impl FakeServer {
    fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("fake server should bind");
        socket
            .set_read_timeout(Some(WAIT))
            .expect("timeout should apply");
        Self {
            socket,
            client: None,
        }
    }

    fn port(&self) -> u16 {
        self.socket.local_addr().expect("bound").port()
    }

    fn recv(&mut self) -> (MessageKind, Vec<u8>) {
        let mut buf = [0u8; 2048];
        let (len, from) = self
            .socket
            .recv_from(&mut buf)
            .expect("client datagram expected");
        self.client = Some(from);
        let msg = decode_message(&buf[..len]).expect("client sends valid envelopes");
        (msg.kind, msg.payload.to_vec())
    }

    /// Next datagram that is not a keep-alive.
    fn recv_request(&mut self) -> (MessageKind, Vec<u8>) {
        loop {
            let (kind, payload) = self.recv();
            if kind != MessageKind::KeepAlive {
                return (kind, payload);
            }
        }
    }

    fn recv_command(&mut self) -> String {
        let (kind, payload) = self.recv_request();
        assert_eq!(kind, MessageKind::Request);
        decode_text(&payload)
    }

    fn send(&self, datagram: &[u8]) {
        let client = self.client.expect("client address known");
        self.socket
            .send_to(datagram, client)
            .expect("fake server send");
    }

    fn send_server_info(&self, server: ProtocolVersion, stream: ProtocolVersion) {
        let payload = server_info_payload("Motive", server, stream);
        let datagram = PayloadBuilder::new()
            .bytes(&payload)
            .message(MessageKind::ServerInfo)
            .expect("server info fits");
        self.send(&datagram);
    }

    fn send_response_code(&self, code: i32) {
        let datagram = PayloadBuilder::new()
            .i32(code)
            .message(MessageKind::Response)
            .expect("response fits");
        self.send(&datagram);
    }
}

fn config_for(server: &FakeServer) -> SessionConfig {
    SessionConfig::default()
        .with_server_address(Ipv4Addr::LOCALHOST)
        .with_local_address(Ipv4Addr::LOCALHOST)
        .with_command_port(server.port())
        .with_multicast(false)
        .with_poll_interval(Duration::from_millis(20))
        .with_keep_alive_interval(Duration::from_millis(100))
        .with_response_timeout(Duration::from_secs(2))
        .with_reset_delays(Duration::from_millis(10), Duration::from_millis(10))
}

/// Start a session and complete the Connect/ServerInfo exchange.
fn connected(server_major: u8) -> (Session, FakeServer, Receiver<SessionEvent>) {
    let mut server = FakeServer::bind();
    let (tx, rx) = mpsc::channel();
    let mut session = Session::new(config_for(&server), tx);
    session.startup().expect("session should start");

    let (kind, payload) = server.recv_request();
    assert_eq!(kind, MessageKind::Connect);
    assert_eq!(payload.len(), 269);
    assert_eq!(&payload[..4], b"Ping");
    assert_eq!(&payload[264..], &[4, 1, 0, 0, 0]);
    assert_eq!(server.recv_request().0, MessageKind::RequestFrameOfData);
    assert_eq!(server.recv_request().0, MessageKind::RequestModelDef);

    server.send_server_info(
        ProtocolVersion::from_quad([server_major, 1, 0, 0]),
        ProtocolVersion::new(4, 1),
    );
    session
        .wait_for_server_info(WAIT)
        .expect("server info should arrive");
    (session, server, rx)
}

fn next_event(rx: &Receiver<SessionEvent>, wanted: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
    let deadline = Instant::now() + WAIT;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        let event = rx.recv_timeout(left).expect("event expected before deadline");
        if wanted(&event) {
            return event;
        }
    }
}

#[test]
fn handshake_negotiates_version() {
    let (mut session, _server, rx) = connected(4);

    assert_eq!(session.phase(), SessionPhase::Active);
    assert!(session.is_connected());
    assert!(session.is_locked());
    assert!(session.can_change_bitstream());
    assert_eq!(session.requested_version(), ProtocolVersion::new(4, 1));
    assert_eq!(session.application_name().as_deref(), Some("Motive"));

    let event = next_event(&rx, |e| matches!(e, SessionEvent::ServerInfo(_)));
    match event {
        SessionEvent::ServerInfo(info) => assert_eq!(info.application_name, "Motive"),
        other => panic!("unexpected event: {other:?}"),
    }

    session.shutdown().expect("clean shutdown");
}

#[test]
fn frames_reach_the_listener() {
    let (mut session, server, rx) = connected(4);

    let frame = PayloadBuilder::new()
        .u32(1234)
        .kind(0, &[])
        .kind(0, &[])
        .kind(1, &rigid_body_record(5, [0.5, 1.0, 1.5], 0.001, 1))
        .kind(0, &[])
        .kind(0, &[])
        .kind(0, &[])
        .kind(0, &[])
        .kind(0, &[])
        .bytes(&suffix_record(99, 12.5, 0b01))
        .message(MessageKind::FrameOfData)
        .expect("frame fits");
    server.send(&frame);

    let event = next_event(&rx, |e| matches!(e, SessionEvent::Frame(_)));
    let SessionEvent::Frame(frame) = event else {
        panic!("frame event expected");
    };
    assert_eq!(frame.frame_number(), Some(1234));
    let bodies = frame.rigid_bodies.expect("rigid bodies decoded");
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].id, 5);
    assert!(bodies[0].tracking_valid());
    let suffix = frame.suffix.expect("suffix decoded");
    assert!(suffix.is_recording());
    assert!(!suffix.tracked_models_changed());

    session.shutdown().expect("clean shutdown");
}

#[test]
fn idle_command_channel_sends_keep_alive() {
    let (mut session, mut server, _rx) = connected(4);

    let start = Instant::now();
    let (kind, payload) = server.recv();
    assert_eq!(kind, MessageKind::KeepAlive);
    assert!(payload.is_empty());
    assert!(start.elapsed() < Duration::from_secs(2));

    session.shutdown().expect("clean shutdown");
}

#[test]
fn accepted_bitstream_change_resets_playback() {
    let (mut session, mut server, _rx) = connected(4);

    let fake = thread::spawn(move || {
        let mut commands = vec![server.recv_command()];
        server.send_response_code(0);
        for _ in 0..5 {
            commands.push(server.recv_command());
        }
        commands
    });

    session
        .set_bitstream_version(ProtocolVersion::new(3, 1))
        .expect("change should be accepted");
    let commands = fake.join().expect("fake server thread");

    assert_eq!(
        commands,
        [
            "Bitstream 3.1",
            "TimelinePlay",
            "TimelinePlay",
            "TimelineStop",
            "SetPlaybackCurrentFrame,0",
            "TimelineStop",
        ]
    );
    assert_eq!(session.requested_version(), ProtocolVersion::new(3, 1));

    session.shutdown().expect("clean shutdown");
}

#[test]
fn rejected_bitstream_change_keeps_version() {
    let (mut session, mut server, _rx) = connected(4);

    let fake = thread::spawn(move || {
        let command = server.recv_command();
        server.send_response_code(1);
        command
    });

    let err = session
        .set_bitstream_version(ProtocolVersion::new(3, 1))
        .unwrap_err();
    assert_eq!(fake.join().expect("fake server thread"), "Bitstream 3.1");
    assert!(matches!(err, SessionError::BitstreamChangeRejected(_)));
    assert_eq!(session.requested_version(), ProtocolVersion::new(4, 1));

    let same = session.set_bitstream_version(ProtocolVersion::new(4, 1));
    assert!(matches!(same, Err(SessionError::BitstreamChangeRejected(_))));

    session.shutdown().expect("clean shutdown");
}

#[test]
fn old_server_cannot_change_bitstream() {
    let (mut session, _server, _rx) = connected(3);

    assert!(!session.can_change_bitstream());
    let err = session
        .set_bitstream_version(ProtocolVersion::new(3, 0))
        .unwrap_err();
    assert!(matches!(err, SessionError::BitstreamChangeRejected(_)));

    session.shutdown().expect("clean shutdown");
}

#[test]
fn shutdown_joins_both_loops() {
    let (mut session, _server, rx) = connected(4);

    let start = Instant::now();
    session.shutdown().expect("clean shutdown");
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!session.is_running());
    assert!(!session.is_connected());
    assert_eq!(session.phase(), SessionPhase::Disconnected);

    let mut exited = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::LoopExit { role, error } = event {
            assert!(error.is_none());
            exited.push(role);
        }
    }
    exited.sort_by_key(|role| role.name());
    assert_eq!(exited, [SocketRole::Command, SocketRole::Data]);

    session.shutdown().expect("second shutdown is a no-op");
}

#[test]
fn shutdown_wakes_loops_blocked_past_shutdown() {
    let server = FakeServer::bind();
    let (tx, rx) = mpsc::channel();
    let config = config_for(&server).with_poll_interval(Duration::from_secs(30));
    let mut session = Session::new(config, tx);
    session.startup().expect("session should start");
    thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    session.shutdown().expect("clean shutdown");
    assert!(start.elapsed() < Duration::from_secs(5));

    let errors: Vec<_> = rx
        .try_iter()
        .filter_map(|event| match event {
            SessionEvent::LoopExit { error, .. } => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(Option::is_none));
}
