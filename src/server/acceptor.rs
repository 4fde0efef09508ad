//! Listener / Acceptor Loop
//!
//! The outermost self-healing loop of the service. The server binds a
//! listening socket with a small backlog and accepts connections forever:
//!
//! - A fault while accepting one connection abandons just that connection
//!   and keeps accepting.
//! - A fault on the listening socket itself discards the socket and
//!   recreates it from scratch. The listener never permanently dies.
//!
//! Whether sessions run one at a time or concurrently is an explicit
//! configuration choice, [`ConcurrencyPolicy`] — the controller hardware
//! this protocol was first built for could only afford one connection at a
//! time, and that mode is preserved alongside the fully concurrent one.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{error, info, warn};

use crate::connection::{handle_session, SessionStats};
use crate::dispatch::CommandRegistry;

/// Listen backlog. Deliberately small; this protocol serves a handful of
/// control clients, not the open internet.
const LISTEN_BACKLOG: u32 = 3;

/// How spawned sessions are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// One session at a time: the acceptor waits for each session to run
    /// to completion before accepting the next connection. The behavior of
    /// the resource-constrained first-generation controller.
    Serialized,
    /// One independent task per session, no limit.
    #[default]
    Concurrent,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Session scheduling policy
    pub concurrency: ConcurrencyPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            concurrency: ConcurrencyPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Owns the listening socket and hands accepted connections to session
/// handlers. Requires a sealed registry, so registration is necessarily
/// complete before the first connection can be accepted.
pub struct Server {
    config: ServerConfig,
    registry: Arc<CommandRegistry>,
    stats: Arc<SessionStats>,
}

impl Server {
    pub fn new(config: ServerConfig, registry: Arc<CommandRegistry>) -> Self {
        Self {
            config,
            registry,
            stats: Arc::new(SessionStats::new()),
        }
    }

    /// Shared session counters, for observation by the embedding process.
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the listener forever.
    ///
    /// Each pass binds a fresh listening socket and accepts until the
    /// socket faults, then rebinds. Rebinding retries indefinitely and
    /// immediately; there is no backoff.
    pub async fn run(&self) {
        loop {
            let listener = match self.bind() {
                Ok(listener) => listener,
                Err(e) => {
                    error!(addr = %self.config.bind_address(), error = %e, "failed to bind listener");
                    tokio::task::yield_now().await;
                    continue;
                }
            };
            info!(addr = %self.config.bind_address(), policy = ?self.config.concurrency, "listening");

            self.accept_loop(listener).await;
            warn!("listening socket faulted; recreating");
        }
    }

    fn bind(&self) -> io::Result<TcpListener> {
        let addr: SocketAddr = self
            .config
            .bind_address()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        socket.listen(LISTEN_BACKLOG)
    }

    /// Accepts connections until the listening socket faults.
    async fn accept_loop(&self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => self.hand_off(stream, addr).await,
                Err(e) if is_transient(&e) => {
                    warn!(error = %e, "failed to accept connection");
                }
                Err(e) => {
                    error!(error = %e, "listening socket fault");
                    return;
                }
            }
        }
    }

    /// Hands one accepted connection to a session handler according to the
    /// configured concurrency policy.
    async fn hand_off(&self, stream: TcpStream, addr: SocketAddr) {
        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);
        match self.config.concurrency {
            ConcurrencyPolicy::Concurrent => {
                tokio::spawn(handle_session(stream, addr, registry, stats));
            }
            ConcurrencyPolicy::Serialized => {
                handle_session(stream, addr, registry, stats).await;
            }
        }
    }
}

/// Whether an accept failure concerns a single connection rather than the
/// listening socket. Transient failures keep the current socket; anything
/// else triggers a rebind.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
