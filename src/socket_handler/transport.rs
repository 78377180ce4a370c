//! Transport primitives for the socket handler.
//!
//! A [`Connection`] owns exactly one non-blocking TCP socket, optionally
//! upgraded to TLS. Every wait on the socket goes through a bounded
//! readiness poll so no single call can stall the caller indefinitely.

use std::{
    io::{self, Read, Write},
    mem,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::debug;
use native_tls::{MidHandshakeTlsStream, TlsConnector, TlsStream};

use super::{
    config::{ACK_LINE_LIMIT, HandshakePolicy, TlsOptions},
    endpoint::Endpoint,
    error::SocketHandlerError,
    writer::NonBlockingWrite,
};

/// Lifecycle of a [`Connection`]. `Closed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Ready,
    Closed,
    Failed,
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    fn tcp(&self) -> &TcpStream {
        match self {
            Stream::Plain(stream) => stream,
            Stream::Tls(stream) => stream.get_ref(),
        }
    }
}

/// The single socket owned by a socket handler.
pub struct Connection {
    state: ConnectionState,
    stream: Option<Stream>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// Create an unconnected handle.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Unconnected,
            stream: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready && self.stream.is_some()
    }

    pub fn is_secure(&self) -> bool {
        matches!(self.stream, Some(Stream::Tls(_)))
    }

    /// Open a TCP connection to `endpoint` and switch it to non-blocking mode.
    ///
    /// Every resolved address is tried in turn, each bounded by `timeout`.
    pub fn connect(
        &mut self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<(), SocketHandlerError> {
        if self.state != ConnectionState::Unconnected {
            return Err(SocketHandlerError::Connection(io::Error::other(
                "connection handle has already been used",
            )));
        }
        self.state = ConnectionState::Connecting;
        match connect_tcp(endpoint, timeout) {
            Ok(stream) => {
                self.stream = Some(Stream::Plain(stream));
                self.state = ConnectionState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Failed;
                Err(SocketHandlerError::Connection(err))
            }
        }
    }

    /// Report whether the socket is readable or writable within `timeout`.
    pub fn poll_ready(&self, for_writing: bool, timeout: Duration) -> bool {
        match &self.stream {
            Some(stream) if self.state == ConnectionState::Ready => {
                poll_socket(stream.tcp(), for_writing, timeout)
            }
            _ => false,
        }
    }

    /// Upgrade the socket to TLS, driving the handshake within `policy`.
    ///
    /// A no-op once the connection is already secured. Any failure leaves the
    /// connection `Failed`.
    pub fn ensure_secure(
        &mut self,
        domain: &str,
        tls: &TlsOptions,
        policy: HandshakePolicy,
    ) -> Result<(), SocketHandlerError> {
        if self.is_secure() {
            return Ok(());
        }
        let tcp = match (self.state, self.stream.take()) {
            (ConnectionState::Ready, Some(Stream::Plain(tcp))) => tcp,
            (_, other) => {
                self.stream = other;
                return Err(SocketHandlerError::Handshake(format!(
                    "connection is {:?}, not ready",
                    self.state
                )));
            }
        };

        let connector = match tls_connector(tls) {
            Ok(connector) => connector,
            Err(err) => {
                self.state = ConnectionState::Failed;
                return Err(err);
            }
        };
        let mut handshake = NativeTlsHandshake {
            connector: &connector,
            domain,
            progress: TlsProgress::Start(tcp),
        };
        match drive_handshake(&mut handshake, policy) {
            Ok(attempts) => match handshake.progress {
                TlsProgress::Done(stream) => {
                    debug!("TLS handshake with {domain} completed after {attempts} attempts");
                    self.stream = Some(Stream::Tls(Box::new(stream)));
                    Ok(())
                }
                _ => {
                    self.state = ConnectionState::Failed;
                    Err(SocketHandlerError::Handshake(
                        "handshake reported completion without a stream".into(),
                    ))
                }
            },
            Err(err) => {
                self.state = ConnectionState::Failed;
                Err(err)
            }
        }
    }

    /// Read and discard at most one response line.
    ///
    /// Waits up to `timeout` for the peer to answer. Timeouts, EOF and read
    /// errors all end the drain quietly. Returns the number of bytes consumed.
    pub fn drain_ack_line(&mut self, timeout: Duration) -> usize {
        if !self.poll_ready(false, timeout) {
            return 0;
        }
        let Some(stream) = self.stream.as_mut() else {
            return 0;
        };
        let mut consumed = 0;
        let mut byte = [0u8; 1];
        while consumed < ACK_LINE_LIMIT {
            let read = match stream {
                Stream::Plain(tcp) => tcp.read(&mut byte),
                Stream::Tls(tls) => tls.read(&mut byte),
            };
            match read {
                Ok(0) => break,
                Ok(_) => {
                    consumed += 1;
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        consumed
    }

    /// Mark the connection as unusable.
    pub fn mark_failed(&mut self) {
        if self.state != ConnectionState::Closed {
            self.state = ConnectionState::Failed;
        }
    }

    /// Release the socket. Idempotent.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            match stream {
                Stream::Plain(tcp) => drop(tcp),
                Stream::Tls(mut tls) => {
                    let _ = tls.shutdown();
                }
            }
        }
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Closed;
        }
    }
}

impl NonBlockingWrite for Connection {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(Stream::Plain(tcp)) if self.state == ConnectionState::Ready => tcp.write(buf),
            Some(Stream::Tls(tls)) if self.state == ConnectionState::Ready => tls.write(buf),
            _ => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    fn poll_writable(&mut self, timeout: Duration) -> bool {
        self.poll_ready(true, timeout)
    }
}

fn socket_addrs(endpoint: &Endpoint) -> io::Result<Vec<SocketAddr>> {
    (endpoint.host(), endpoint.port())
        .to_socket_addrs()
        .map(|iter| iter.collect())
}

fn connect_tcp(endpoint: &Endpoint, timeout: Duration) -> io::Result<TcpStream> {
    let addrs = socket_addrs(endpoint)?;
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nonblocking(true)?;
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "no addresses resolved for {}:{}",
                endpoint.host(),
                endpoint.port()
            ),
        )
    }))
}

fn tls_connector(tls: &TlsOptions) -> Result<TlsConnector, SocketHandlerError> {
    let mut builder = TlsConnector::builder();
    if tls.insecure_skip_verify {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }
    builder
        .build()
        .map_err(|err| SocketHandlerError::Handshake(err.to_string()))
}

/// Outcome of a single handshake step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeStatus {
    Complete,
    WouldBlock,
    Failed(String),
}

/// A handshake that may need several non-blocking steps to finish.
pub trait Handshake {
    /// Make one attempt at completing the handshake.
    fn advance(&mut self) -> HandshakeStatus;

    /// Wait up to `timeout` for the socket to become ready again.
    fn wait(&mut self, timeout: Duration);
}

/// Drive `handshake` until it completes, fails, or runs out of attempts.
///
/// Returns the number of attempts it took to complete.
pub fn drive_handshake<H>(
    handshake: &mut H,
    policy: HandshakePolicy,
) -> Result<u32, SocketHandlerError>
where
    H: Handshake + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        match handshake.advance() {
            HandshakeStatus::Complete => return Ok(attempt),
            HandshakeStatus::Failed(reason) => return Err(SocketHandlerError::Handshake(reason)),
            HandshakeStatus::WouldBlock => {
                if attempt < policy.max_attempts {
                    handshake.wait(policy.poll_interval);
                }
            }
        }
    }
    Err(SocketHandlerError::Handshake(format!(
        "handshake did not complete within {} attempts",
        policy.max_attempts
    )))
}

enum TlsProgress {
    Start(TcpStream),
    Mid(MidHandshakeTlsStream<TcpStream>),
    Done(TlsStream<TcpStream>),
    Broken,
}

struct NativeTlsHandshake<'a> {
    connector: &'a TlsConnector,
    domain: &'a str,
    progress: TlsProgress,
}

impl NativeTlsHandshake<'_> {
    fn settle(
        &mut self,
        result: Result<TlsStream<TcpStream>, native_tls::HandshakeError<TcpStream>>,
    ) -> HandshakeStatus {
        match result {
            Ok(stream) => {
                self.progress = TlsProgress::Done(stream);
                HandshakeStatus::Complete
            }
            Err(native_tls::HandshakeError::WouldBlock(mid)) => {
                self.progress = TlsProgress::Mid(mid);
                HandshakeStatus::WouldBlock
            }
            Err(native_tls::HandshakeError::Failure(err)) => HandshakeStatus::Failed(err.to_string()),
        }
    }
}

impl Handshake for NativeTlsHandshake<'_> {
    fn advance(&mut self) -> HandshakeStatus {
        match mem::replace(&mut self.progress, TlsProgress::Broken) {
            TlsProgress::Start(tcp) => {
                let result = self.connector.connect(self.domain, tcp);
                self.settle(result)
            }
            TlsProgress::Mid(mid) => {
                let result = mid.handshake();
                self.settle(result)
            }
            TlsProgress::Done(stream) => {
                self.progress = TlsProgress::Done(stream);
                HandshakeStatus::Complete
            }
            TlsProgress::Broken => HandshakeStatus::Failed("handshake state lost".into()),
        }
    }

    fn wait(&mut self, timeout: Duration) {
        // The client side of a handshake blocks almost exclusively on reads.
        match &self.progress {
            TlsProgress::Start(tcp) => {
                poll_socket(tcp, false, timeout);
            }
            TlsProgress::Mid(mid) => {
                poll_socket(mid.get_ref(), false, timeout);
            }
            TlsProgress::Done(_) | TlsProgress::Broken => {}
        }
    }
}

#[cfg(unix)]
fn poll_socket(stream: &TcpStream, for_writing: bool, timeout: Duration) -> bool {
    use std::os::fd::AsRawFd;

    let events = if for_writing {
        libc::POLLOUT
    } else {
        libc::POLLIN
    };
    let mut pfd = libc::pollfd {
        fd: stream.as_raw_fd(),
        events,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
    // SAFETY: `pfd` is a valid, exclusively borrowed pollfd and nfds is 1.
    let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
    rc > 0 && pfd.revents & events != 0
}

#[cfg(not(unix))]
fn poll_socket(_stream: &TcpStream, _for_writing: bool, timeout: Duration) -> bool {
    // Without poll(2) the next I/O attempt reports WouldBlock instead.
    std::thread::sleep(timeout.min(Duration::from_millis(10)));
    true
}
