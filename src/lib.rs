//! # comlink - A Network Command Protocol Server
//!
//! comlink is a small TCP server that lets clients steer independently
//! registered device handlers with a single-line text protocol. It was
//! built for embedded instrument control (focusers, probes, relays) where
//! clients are simple and the wire format has to stay stable.
//!
//! ## Protocol
//!
//! One request per line, addressed by device and verb:
//!
//! ```text
//! <F1,234,MoveTo=12345>
//! ```
//!
//! Each request is answered with a transaction-tagged, key/value response:
//!
//! ```text
//! !234
//! Position = 12345
//! END
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             comlink                              │
//! │                                                                  │
//! │  ┌────────────┐    ┌─────────────┐    ┌───────────────────────┐  │
//! │  │  Acceptor  │───>│   Session   │───>│    CommandRegistry    │  │
//! │  │   (TCP)    │    │   Handler   │    │      (dispatch)       │  │
//! │  └────────────┘    └─────────────┘    └──────────┬────────────┘  │
//! │                           │                      │               │
//! │                           ▼                      ▼               │
//! │                    ┌─────────────┐    ┌───────────────────────┐  │
//! │                    │   Protocol  │    │  Device collaborators │  │
//! │                    │ parse/encode│    │  (CommandTarget)      │  │
//! │                    └─────────────┘    └───────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bytes in → parser → `Command` → dispatcher → `Response` → encoder →
//! bytes out, orchestrated per connection by the session handler, which is
//! itself spawned by the acceptor loop.
//!
//! ## Quick Start
//!
//! ```ignore
//! use comlink::devices::{Focuser, TemperatureProbe};
//! use comlink::dispatch::RegistryBuilder;
//! use comlink::server::{Server, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Register every device before the first connection is accepted.
//!     let mut builder = RegistryBuilder::new();
//!     builder.register(&Focuser::new("F1")).unwrap();
//!     builder.register(&TemperatureProbe::new("T1", 12.5)).unwrap();
//!
//!     // Sealing makes the registry read-only and shareable.
//!     let registry = Arc::new(builder.seal());
//!
//!     Server::new(ServerConfig::default(), registry).run().await;
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: wire grammar parser, Command/Response values, encoder
//! - [`dispatch`]: capability records, registry lifecycle, dispatcher
//! - [`connection`]: per-connection session loop
//! - [`server`]: self-healing listener/acceptor loop
//! - [`devices`]: reference device collaborators
//!
//! ## Design Highlights
//!
//! ### Failure Isolation
//!
//! Command-level faults (bad grammar, unknown device or verb, processor
//! errors) are always answered on the open connection. Transport faults
//! kill only their own session; listener faults cause the acceptor to
//! rebuild the socket. No fault takes the process down.
//!
//! ### Read-Only Registry
//!
//! The registry has two phases: a builder that accepts registrations at
//! startup and a sealed, immutable registry shared across sessions. The
//! "no writes after init" rule is enforced by the type system, not by
//! timing.

pub mod connection;
pub mod devices;
pub mod dispatch;
pub mod protocol;
pub mod server;

// Re-export commonly used types for convenience
pub use connection::{handle_session, SessionHandler, SessionStats};
pub use dispatch::{Capability, CommandRegistry, CommandTarget, ProcessorError, RegistryBuilder};
pub use protocol::{parse_command, Command, ParseError, Response, ResponseBuilder};
pub use server::{ConcurrencyPolicy, Server, ServerConfig};

/// The default port comlink listens on
pub const DEFAULT_PORT: u16 = 3564;

/// The default host comlink binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of comlink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
