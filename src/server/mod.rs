//! TCP Server
//!
//! The listener/acceptor loop that owns the listening socket and feeds the
//! connection module. Self-healing by construction: per-connection faults
//! are logged and skipped, listener faults cause the socket to be rebuilt
//! from scratch, and the loop itself never returns.
//!
//! ## Example
//!
//! ```ignore
//! use comlink::dispatch::RegistryBuilder;
//! use comlink::server::{Server, ServerConfig};
//! use std::sync::Arc;
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register(&my_device)?;
//! let registry = Arc::new(builder.seal());
//!
//! let server = Server::new(ServerConfig::default(), registry);
//! server.run().await; // never returns
//! ```

pub mod acceptor;

// Re-export the server surface
pub use acceptor::{ConcurrencyPolicy, Server, ServerConfig};
