//! Connection Session Management
//!
//! Each accepted connection is driven by its own [`SessionHandler`],
//! running independently of every other session.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Listener / Acceptor                       │
//! │                    (server module)                          │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ one handler per connection
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SessionHandler                           │
//! │                                                             │
//! │  read ──> 7-bit decode ──> parse ──> dispatch ──> respond   │
//! │   ▲                                                  │      │
//! │   └──────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A session ends only when the peer disconnects or the transport fails;
//! command-level errors are answered on the open connection. The sealed
//! registry is the only state a session shares with the rest of the
//! process, read-only through an `Arc`.

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_session, ConnectionError, SessionHandler, SessionStats};
