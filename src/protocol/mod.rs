//! Wire Protocol Implementation
//!
//! This module implements the single-line text protocol spoken between
//! clients and the server.
//!
//! ## Overview
//!
//! A request is one ASCII line, decoded with a strict 7-bit mapping on
//! receipt:
//!
//! ```text
//! <DeviceAddress,TransactionId,Verb[=Payload]>
//! ```
//!
//! A response echoes the transaction id, lists key/value payload items,
//! and closes with a literal `END` line:
//!
//! ```text
//! !<TransactionId>
//! <Key> = <Value>
//! ...
//! END
//! ```
//!
//! ## Modules
//!
//! - `types`: the immutable [`Command`] and [`Response`] values, the
//!   [`ResponseBuilder`], and the response encoder
//! - `parser`: the wire grammar, 7-bit receive decoding, and ASCII
//!   mnemonic expansion for diagnostics
//!
//! ## Example
//!
//! ```ignore
//! use comlink::protocol::{parse_command, Response};
//!
//! let command = parse_command("<F1,234,MoveTo=12345>")?;
//! assert_eq!(command.position(), Some(12345));
//!
//! let response = Response::from_successful_command(&command);
//! let wire = response.encode(); // "!234\nEND\n"
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used items for convenience
pub use parser::{decode_7bit, expand_ascii, parse_command, ParseError};
pub use types::{Command, Response, ResponseBuilder};
