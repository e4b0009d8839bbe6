use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};

/// Which NatNet channel a socket serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketRole {
    /// Requests, handshake replies, keep-alives.
    Command,
    /// Frame-of-data stream.
    Data,
}

impl SocketRole {
    pub fn name(self) -> &'static str {
        match self {
            SocketRole::Command => "command",
            SocketRole::Data => "data",
        }
    }
}

impl std::fmt::Display for SocketRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A bound NatNet UDP socket.
///
/// Clones made with [`try_clone`](Self::try_clone) share the shutdown
/// state, so the owner can close a socket that a receive loop is blocked on.
pub struct NatNetSocket {
    socket: UdpSocket,
    role: SocketRole,
    closed: Arc<AtomicBool>,
}

impl NatNetSocket {
    pub(crate) fn new(socket: UdpSocket, role: SocketRole) -> Self {
        Self {
            socket,
            role,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wrap an already-bound socket.
    pub fn from_std(socket: UdpSocket, role: SocketRole) -> Self {
        Self::new(socket, role)
    }

    pub fn role(&self) -> SocketRole {
        self.role
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// Receive one datagram.
    ///
    /// Returns `Ok(None)` when the read timeout expires, the call is
    /// interrupted, an empty datagram arrives or a stale ICMP error
    /// surfaces, and [`TransportError::Shutdown`] once the socket has been
    /// closed.
    pub fn recv(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        if self.is_closed() {
            return Err(TransportError::Shutdown);
        }
        match self.socket.recv_from(buf) {
            Ok(_) if self.is_closed() => Err(TransportError::Shutdown),
            Ok((0, from)) => {
                trace!(role = %self.role, %from, "empty datagram ignored");
                Ok(None)
            }
            Ok(received) => Ok(Some(received)),
            // Reset/refused are ICMP echoes of an earlier send on some platforms.
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock
                        | ErrorKind::TimedOut
                        | ErrorKind::Interrupted
                        | ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionRefused
                ) =>
            {
                if self.is_closed() {
                    return Err(TransportError::Shutdown);
                }
                Ok(None)
            }
            Err(err) if self.is_closed() => {
                debug!(role = %self.role, error = %err, "receive ended by shutdown");
                Err(TransportError::Shutdown)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    /// Send one datagram to `addr`.
    pub fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<usize> {
        if self.is_closed() {
            return Err(TransportError::Shutdown);
        }
        self.socket
            .send_to(buf, addr)
            .map_err(|source| TransportError::Send { addr, source })
    }

    /// Set read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket
            .set_read_timeout(timeout)
            .map_err(|source| TransportError::Configure {
                option: "SO_RCVTIMEO",
                source,
            })
    }

    pub fn read_timeout(&self) -> Result<Option<Duration>> {
        self.socket.read_timeout().map_err(Into::into)
    }

    /// Try to clone this socket (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.socket.try_clone()?;
        Ok(Self {
            socket: cloned,
            role: self.role,
            closed: Arc::clone(&self.closed),
        })
    }

    /// Close the socket for every clone and wake any blocked receive.
    ///
    /// Idempotent. The socket sends itself an empty datagram so a reader
    /// blocked in `recv` returns and sees the closed flag. If that datagram
    /// is lost, the reader still stops at its next read timeout.
    ///
    /// `shutdown(2)` is not used: on Linux it wakes an unconnected datagram
    /// receive with an empty source address, which std rejects.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.wake_addr() {
            Ok(addr) => {
                if let Err(err) = self.socket.send_to(&[], addr) {
                    debug!(role = %self.role, %addr, error = %err, "wake datagram failed");
                }
            }
            Err(err) => debug!(role = %self.role, error = %err, "no local address to wake"),
        }
        debug!(role = %self.role, "socket shut down");
    }

    /// Where to send the wake datagram: the bound port, on loopback when
    /// the socket is bound to the wildcard address.
    fn wake_addr(&self) -> std::io::Result<SocketAddr> {
        let mut addr = self.socket.local_addr()?;
        if addr.ip().is_unspecified() {
            addr.set_ip(Ipv4Addr::LOCALHOST.into());
        }
        Ok(addr)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for NatNetSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatNetSocket")
            .field("role", &self.role)
            .field("local_addr", &self.socket.local_addr().ok())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn loopback(role: SocketRole) -> NatNetSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("loopback bind should succeed");
        NatNetSocket::from_std(socket, role)
    }

    #[test]
    fn test_send_and_recv() {
        let a = loopback(SocketRole::Command);
        let b = loopback(SocketRole::Data);
        b.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        a.send_to(b"hello", b.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = b.recv(&mut buf).unwrap().expect("datagram expected");
        assert_eq!(&buf[..len], b"hello");
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[test]
    fn test_recv_timeout_is_none() {
        let sock = loopback(SocketRole::Command);
        sock.set_read_timeout(Some(Duration::from_millis(20))).unwrap();

        let mut buf = [0u8; 16];
        assert!(sock.recv(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_shutdown_wakes_blocked_clone() {
        let sock = loopback(SocketRole::Data);
        sock.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
        let reader = sock.try_clone().unwrap();

        let start = Instant::now();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 16];
            loop {
                match reader.recv(&mut buf) {
                    Ok(_) => continue,
                    Err(err) => return err,
                }
            }
        });

        thread::sleep(Duration::from_millis(50));
        sock.shutdown();
        let err = handle.join().expect("reader thread should finish");

        assert!(matches!(err, TransportError::Shutdown));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_shutdown_wakes_reader_without_timeout() {
        let socket = UdpSocket::bind("0.0.0.0:0").expect("wildcard bind should succeed");
        let sock = NatNetSocket::from_std(socket, SocketRole::Data);
        let reader = sock.try_clone().unwrap();

        let start = Instant::now();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 16];
            reader.recv(&mut buf)
        });

        thread::sleep(Duration::from_millis(50));
        sock.shutdown();
        let result = handle.join().expect("reader must not panic");

        assert!(matches!(result, Err(TransportError::Shutdown)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_empty_datagram_is_not_a_message() {
        let a = loopback(SocketRole::Command);
        let b = loopback(SocketRole::Data);
        b.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        a.send_to(&[], b.local_addr().unwrap()).unwrap();
        a.send_to(b"frame", b.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; 16];
        assert!(b.recv(&mut buf).unwrap().is_none());
        let (len, _) = b.recv(&mut buf).unwrap().expect("datagram expected");
        assert_eq!(&buf[..len], b"frame");
    }

    #[test]
    fn test_send_after_shutdown_fails() {
        let sock = loopback(SocketRole::Command);
        let target = sock.local_addr().unwrap();
        sock.shutdown();
        sock.shutdown();

        assert!(sock.is_closed());
        assert!(matches!(
            sock.send_to(b"x", target),
            Err(TransportError::Shutdown)
        ));
    }
}
