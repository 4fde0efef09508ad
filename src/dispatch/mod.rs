//! Command Registry and Dispatch
//!
//! This module owns the routing layer between parsed commands and the
//! device handlers that execute them.
//!
//! ## Architecture
//!
//! ```text
//! Parsed Command
//!       │
//!       ▼
//! ┌──────────────────┐     consults      ┌────────────────────────────┐
//! │ CommandRegistry  │──────────────────>│ Capability records         │
//! │    dispatch()    │                   │  (device, verb, execute)   │
//! └────────┬─────────┘                   └────────────────────────────┘
//!          │                                         ▲
//!          ▼                                         │ capabilities()
//!      Response                          ┌────────────────────────────┐
//!  (success or structured                │ CommandTarget collaborators│
//!       dispatch error)                  │  (devices module)          │
//!                                        └────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! The registry is built once at startup ([`RegistryBuilder`], the Building
//! phase) and then sealed ([`CommandRegistry`], read-only) before the first
//! connection is accepted. Sessions share the sealed registry through an
//! `Arc` and only ever read it, so dispatch needs no locking.

pub mod capability;
pub mod registry;

// Re-export the dispatch surface
pub use capability::{Capability, CommandTarget, ProcessorError, ProcessorFn};
pub use registry::{CommandRegistry, RegistryBuilder, RegistryError};
