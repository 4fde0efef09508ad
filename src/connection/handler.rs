//! Session Handler
//!
//! Drives one accepted connection through its lifetime: read a request,
//! decode it, parse it, dispatch it, write the response, repeat until the
//! peer disconnects or the transport fails.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Connection accepted
//!        │
//!        ▼
//! 2. SessionHandler created
//!        │
//!        ▼
//! 3. ┌──────────────────────────────────┐
//!    │           Main Loop              │
//!    │                                  │
//!    │  read bytes (fixed buffer)       │
//!    │        │ 0 bytes → session ends  │
//!    │        ▼                         │
//!    │  7-bit decode                    │
//!    │        │ under 6 chars → discard │
//!    │        ▼                         │
//!    │  parse ──── ParseError ──┐       │
//!    │        │                 │       │
//!    │        ▼                 ▼       │
//!    │  dispatch        canned response │
//!    │        │                 │       │
//!    │        ▼                 │       │
//!    │  encode + write <────────┘       │
//!    │        │                         │
//!    │        ▼                         │
//!    │    [loop back]                   │
//!    └──────────────────────────────────┘
//!        │
//!        ▼
//! 4. Peer disconnects or I/O fault → socket closed
//! ```
//!
//! ## Failure Semantics
//!
//! Transport faults (any I/O error) are fatal to this session only: the
//! loop exits and the socket closes. Every command-level fault — malformed
//! request, unknown device or verb, processor failure — is recovered into a
//! response on the same connection, which stays open indefinitely until the
//! peer goes away.
//!
//! Requests within one connection are strictly serialized: the loop never
//! starts a new read until the previous response has been fully written.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use crate::dispatch::CommandRegistry;
use crate::protocol::{decode_7bit, expand_ascii, parse_command, Response};

/// Size of the receive buffer. One buffer is allocated per session and
/// reused for every read; a request longer than this is truncated at the
/// transport and will fail to parse.
const RX_BUFFER_SIZE: usize = 1024;

/// The shortest grammatically plausible request. Anything shorter is
/// discarded without a response.
const MIN_REQUEST_LENGTH: usize = 6;

/// Counters shared across all sessions.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Total sessions opened since startup
    pub sessions_opened: AtomicU64,
    /// Sessions currently running
    pub sessions_active: AtomicU64,
    /// Requests answered (including error responses)
    pub requests_handled: AtomicU64,
    /// Requests that failed to parse
    pub parse_failures: AtomicU64,
    /// Total bytes read from clients
    pub bytes_read: AtomicU64,
    /// Total bytes written to clients
    pub bytes_written: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    fn request_handled(&self) {
        self.requests_handled.fetch_add(1, Ordering::Relaxed);
    }

    fn parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Transport fault. Fatal to this session only; never reported to the
    /// peer because the channel is already broken.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("client disconnected")]
    Disconnected,
}

/// Handles a single client connection: owns the stream, the reused receive
/// buffer, and a handle to the sealed registry.
pub struct SessionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    registry: Arc<CommandRegistry>,
    buffer: BytesMut,
    stats: Arc<SessionStats>,
}

impl SessionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        registry: Arc<CommandRegistry>,
        stats: Arc<SessionStats>,
    ) -> Self {
        stats.session_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            registry,
            buffer: BytesMut::with_capacity(RX_BUFFER_SIZE),
            stats,
        }
    }

    /// Runs the session to completion.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "accepting requests");

        let result = self.main_loop().await;

        match &result {
            Ok(()) | Err(ConnectionError::Disconnected) => {
                debug!(client = %self.addr, "client disconnected")
            }
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "connection reset by client")
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "closing connection after transport fault")
            }
        }

        self.stats.session_closed();
        result
    }

    /// The read-decode-parse-dispatch-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let request = match self.read_request().await? {
                Some(text) => text,
                None => continue, // Too short to be a request; ignore it.
            };

            let command = match parse_command(&request) {
                Ok(command) => command,
                Err(e) => {
                    self.stats.parse_failure();
                    debug!(client = %self.addr, error = %e, "request failed to parse");
                    let response = Response::from_invalid_command(e.fragment());
                    self.send_response(&response).await?;
                    continue;
                }
            };

            let response = self.registry.dispatch(&command);
            self.send_response(&response).await?;
            self.stats.request_handled();
        }
    }

    /// Reads one request from the socket into the reused buffer and decodes
    /// it. Returns `None` for requests under the minimum viable length,
    /// which are silently discarded.
    async fn read_request(&mut self) -> Result<Option<String>, ConnectionError> {
        self.buffer.clear();
        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(ConnectionError::Disconnected);
        }
        self.stats.bytes_read(n);

        let text = decode_7bit(&self.buffer[..n]);
        trace!(client = %self.addr, request = %expand_ascii(&text), "received");

        if text.len() < MIN_REQUEST_LENGTH {
            debug!(client = %self.addr, "request too short, ignoring");
            return Ok(None);
        }
        Ok(Some(text))
    }

    /// Encodes and writes one response, flushing before the next read.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let wire = response.encode();
        self.stream.write_all(wire.as_bytes()).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(wire.len());
        trace!(client = %self.addr, bytes = wire.len(), "sent response");
        Ok(())
    }
}

/// Runs a session to completion, logging how it ended. This is the
/// function the acceptor hands connections to.
pub async fn handle_session(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<CommandRegistry>,
    stats: Arc<SessionStats>,
) {
    let handler = SessionHandler::new(stream, addr, registry, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::Disconnected => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "session ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Capability, CommandTarget, ProcessorError, RegistryBuilder};
    use crate::protocol::ResponseBuilder;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct EchoDevice;

    impl CommandTarget for EchoDevice {
        fn capabilities(&self) -> Vec<Capability> {
            vec![
                Capability::new("F1", "Ping", |command| {
                    let mut builder = ResponseBuilder::new(command);
                    builder.add_payload_item("Pong", "ok");
                    Ok(builder.to_response())
                }),
                Capability::new("F1", "Fail", |command| {
                    Err(ProcessorError::new(command, "scripted failure"))
                }),
            ]
        }
    }

    async fn create_test_server() -> (SocketAddr, Arc<SessionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut builder = RegistryBuilder::new();
        builder.register(&EchoDevice).unwrap();
        let registry = Arc::new(builder.seal());
        let stats = Arc::new(SessionStats::new());

        let stats_clone = Arc::clone(&stats);
        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let registry = Arc::clone(&registry);
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_session(stream, client_addr, registry, stats));
            }
        });

        (addr, stats)
    }

    async fn read_reply(client: &mut TcpStream) -> String {
        let mut buf = [0u8; 512];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).to_string()
    }

    #[tokio::test]
    async fn request_response_exchange() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"<F1,99,Ping>\r\n").await.unwrap();
        let reply = read_reply(&mut client).await;

        assert!(reply.starts_with("!99\n"));
        assert!(reply.contains("Pong = ok\n"));
        assert!(reply.ends_with("END\n"));
    }

    #[tokio::test]
    async fn malformed_request_gets_canned_response_and_connection_survives() {
        let (addr, stats) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"this is not a command\r\n").await.unwrap();
        let reply = read_reply(&mut client).await;
        assert!(reply.starts_with("!0\n"));
        assert!(reply.contains("Error = Unable to parse command\n"));
        assert!(reply.contains("[this is not a command<CR><LF>]"));

        // The same connection still answers valid requests.
        client.write_all(b"<F1,7,Ping>\r\n").await.unwrap();
        let reply = read_reply(&mut client).await;
        assert!(reply.starts_with("!7\n"));

        assert!(stats.parse_failures.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn short_request_is_ignored_and_connection_stays_open() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"<a>\r\n").await.unwrap();

        // No response arrives for the short request.
        let mut buf = [0u8; 64];
        let no_reply =
            tokio::time::timeout(Duration::from_millis(200), client.read(&mut buf)).await;
        assert!(no_reply.is_err(), "expected no response to a short request");

        // The session is still alive and serves the next request.
        client.write_all(b"<F1,11,Ping>\r\n").await.unwrap();
        let reply = read_reply(&mut client).await;
        assert!(reply.starts_with("!11\n"));
    }

    #[tokio::test]
    async fn disconnect_ends_session_without_response() {
        let (addr, stats) = create_test_server().await;

        let client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.sessions_active.load(Ordering::Relaxed), 1);

        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.sessions_active.load(Ordering::Relaxed), 0);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn dispatch_error_is_answered_on_open_connection() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"<Z9,5,Ping>\r\n").await.unwrap();
        let reply = read_reply(&mut client).await;
        assert!(reply.starts_with("!5\n"));
        assert!(reply.contains("Valid addresses = F1\n"));

        client.write_all(b"<F1,6,Fail>\r\n").await.unwrap();
        let reply = read_reply(&mut client).await;
        assert!(reply.starts_with("!6\n"));
        assert!(reply.contains("scripted failure"));
    }

    #[tokio::test]
    async fn high_bit_set_bytes_are_decoded() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let request: Vec<u8> = b"<F1,42,Ping>".iter().map(|b| b | 0x80).collect();
        client.write_all(&request).await.unwrap();
        let reply = read_reply(&mut client).await;
        assert!(reply.starts_with("!42\n"));
    }
}
