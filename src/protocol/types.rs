//! Command and Response Value Types
//!
//! This module defines the immutable data carried through the request
//! pipeline: the [`Command`] produced by the parser and the [`Response`]
//! produced by command processors, plus the [`ResponseBuilder`] used to
//! assemble responses incrementally.
//!
//! ## Wire Formats
//!
//! Request (one per line, parsed in the `parser` module):
//!
//! ```text
//! <DeviceAddress,TransactionId,Verb[=Payload]>
//! ```
//!
//! Response (rendered by [`Response::encode`]):
//!
//! ```text
//! !<TransactionId>
//! <Key> = <Value>
//! ...
//! END
//! ```
//!
//! Every response line is newline-terminated. Payload entry ordering is not
//! part of the contract; clients must key on the `<Key>` names.

use std::collections::HashMap;
use std::fmt;

use crate::protocol::parser::expand_ascii;

/// An immutable command received from a client.
///
/// Created once per successfully parsed request and discarded after the
/// response has been sent. The [`Command::invalid`] sentinel stands in for
/// "no command available" on error paths that precede a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    device_address: String,
    transaction_id: i32,
    verb: String,
    payload: String,
    position: Option<i32>,
    source: String,
}

impl Command {
    pub(crate) fn new(
        device_address: impl Into<String>,
        transaction_id: i32,
        verb: impl Into<String>,
        payload: impl Into<String>,
        position: Option<i32>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            device_address: device_address.into(),
            transaction_id,
            verb: verb.into(),
            payload: payload.into(),
            position,
            source: source.into(),
        }
    }

    /// The "no command" sentinel: all fields empty, transaction id zero.
    pub fn invalid() -> Self {
        Self::new("", 0, "", "", None, "")
    }

    /// The device this command is addressed to, e.g. `"F1"`.
    /// Matched exactly against registered capabilities.
    pub fn device_address(&self) -> &str {
        &self.device_address
    }

    /// Client-supplied correlation id, echoed back in the response.
    /// No uniqueness requirement.
    pub fn transaction_id(&self) -> i32 {
        self.transaction_id
    }

    /// The command name. Matched case-insensitively; original casing is
    /// preserved for echo.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The raw payload text. Empty means "no payload".
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Numeric form of the payload, present only when the payload consists
    /// solely of digits. `None` is the no-position sentinel.
    pub fn position(&self) -> Option<i32> {
        self.position
    }

    /// The original wire text this command was parsed from, retained for
    /// diagnostics and error context.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeviceAddress={} TransactionId={} Verb={} Payload={}",
            self.device_address, self.transaction_id, self.verb, self.payload
        )
    }
}

/// An immutable response to be transmitted to a client.
///
/// Carries the transaction id of the originating command and a set of
/// uniquely keyed payload items. Build one with [`ResponseBuilder`] or the
/// canned constructors below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    transaction_id: i32,
    payload: HashMap<String, String>,
}

impl Response {
    /// The transaction id echoed from the originating command.
    pub fn transaction_id(&self) -> i32 {
        self.transaction_id
    }

    /// The response payload: unique keys, ordering not guaranteed.
    pub fn payload(&self) -> &HashMap<String, String> {
        &self.payload
    }

    /// An empty acknowledgement for a command that completed with nothing
    /// to report.
    pub fn from_successful_command(command: &Command) -> Self {
        ResponseBuilder::new(command).to_response()
    }

    /// The canned response for a request that failed to parse. Seeded from
    /// the invalid-command sentinel, so the transaction id is zero. The
    /// offending fragment is quoted with non-printable characters expanded
    /// so the response stays line-structured.
    pub fn from_invalid_command(fragment: &str) -> Self {
        let mut builder = ResponseBuilder::new(&Command::invalid());
        builder.add_payload_item("Error", "Unable to parse command");
        builder.add_payload_item(
            "Reason",
            format!(
                "[{}] is not in the correct format <Fn,t,Verb=Payload>",
                expand_ascii(fragment)
            ),
        );
        builder.to_response()
    }

    /// An error response carrying the error text plus the failed command's
    /// device, verb and payload for context. The transaction id is taken
    /// from the command as usual.
    pub fn from_error(message: &str, command: &Command) -> Self {
        ResponseBuilder::for_error(message, command).to_response()
    }

    /// Renders this response as wire text.
    ///
    /// The only wire-level serialization in the system; there is no
    /// corresponding generic deserializer, clients parse this themselves.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(16 + self.payload.len() * 24);
        out.push('!');
        out.push_str(&self.transaction_id.to_string());
        out.push('\n');
        for (key, value) in &self.payload {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        out.push_str("END\n");
        out
    }
}

/// Assembles a [`Response`] incrementally: seeds the transaction id from a
/// [`Command`], accumulates payload items, then finalizes. Once built, the
/// response is read-only.
pub struct ResponseBuilder {
    transaction_id: i32,
    payload: HashMap<String, String>,
}

impl ResponseBuilder {
    pub fn new(command: &Command) -> Self {
        Self {
            transaction_id: command.transaction_id(),
            payload: HashMap::new(),
        }
    }

    /// Starts an error response: the error text plus the failed command's
    /// device, verb and payload for context. Callers may add further items
    /// before finalizing.
    pub fn for_error(message: &str, command: &Command) -> Self {
        let mut builder = Self::new(command);
        builder.add_payload_item("Error", message);
        builder.add_payload_item("Device", command.device_address());
        builder.add_payload_item("Verb", command.verb());
        if command.has_payload() {
            builder.add_payload_item("Payload", command.payload());
        }
        builder
    }

    /// Adds one key/value pair. Keys are unique within a response; adding
    /// an existing key replaces its value.
    pub fn add_payload_item(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.payload.insert(key.into(), value.into());
    }

    pub fn to_response(self) -> Response {
        Response {
            transaction_id: self.transaction_id,
            payload: self.payload,
        }
    }
}
