//! Wire Grammar Parser
//!
//! Turns a raw request line into a [`Command`] or a [`ParseError`]. The
//! grammar is a single bracketed form:
//!
//! ```text
//! <DeviceAddress,TransactionId,Verb[=Payload]>
//! ```
//!
//! - `DeviceAddress` is a word-class character followed by one digit
//!   (`F1`, `T1`, ...).
//! - `TransactionId` is one or more decimal digits. Any digit count is
//!   accepted.
//! - `Verb` is a letter followed by one or more word characters.
//! - `Payload` is optional. An all-digit payload is captured twice: as the
//!   numeric `position` and as the original digit string in `payload`. Any
//!   other payload populates `payload` only.
//!
//! The matcher scans the received text for the bracketed form; on mismatch
//! it fails with the original fragment and produces no partial command.
//!
//! This module also owns the wire-level text handling that sits in front of
//! the grammar: [`decode_7bit`], the strict receive-side byte mapping, and
//! [`expand_ascii`], which renders non-printable characters as mnemonics
//! for diagnostics.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::protocol::types::Command;

/// Matches `<Dn,TT,Verb=Payload>` anywhere in the received text.
///
/// Capture groups: 1 = device address, 2 = transaction id, 3 = verb,
/// 4 = payload (either alternative), 5 = all-digit payload. Alternation
/// order matters: the digit form is tried first so numeric payloads also
/// yield a position.
static COMMAND_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(\w\d),(\d+),([A-Za-z]\w+)(?:=((\d+)|.+))?>").expect("command grammar is valid")
});

/// Errors produced while turning a request line into a [`Command`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text did not match the command grammar.
    #[error("[{fragment}] is not in the correct format <Fn,t,Verb=Payload>")]
    Malformed { fragment: String },

    /// The grammar matched but a numeric field does not fit in an i32.
    #[error("numeric field out of range in [{fragment}]")]
    OutOfRange { fragment: String },
}

impl ParseError {
    /// The original wire fragment that failed to parse.
    pub fn fragment(&self) -> &str {
        match self {
            ParseError::Malformed { fragment } | ParseError::OutOfRange { fragment } => fragment,
        }
    }
}

/// Parses one request line into a [`Command`].
///
/// On success the command's `source` field holds the exact matched text.
/// On failure no partial command is produced; the error carries the
/// offending fragment for the canned error response.
pub fn parse_command(text: &str) -> Result<Command, ParseError> {
    let captures = COMMAND_GRAMMAR
        .captures(text)
        .ok_or_else(|| ParseError::Malformed {
            fragment: text.to_string(),
        })?;

    let device_address = &captures[1];
    let transaction_id: i32 = captures[2].parse().map_err(|_| ParseError::OutOfRange {
        fragment: text.to_string(),
    })?;
    let verb = &captures[3];
    let payload = captures.get(4).map(|m| m.as_str()).unwrap_or("");
    let position: Option<i32> = match captures.get(5) {
        Some(digits) => Some(digits.as_str().parse().map_err(|_| ParseError::OutOfRange {
            fragment: text.to_string(),
        })?),
        None => None,
    };
    let source = &captures[0];

    Ok(Command::new(
        device_address,
        transaction_id,
        verb,
        payload,
        position,
        source,
    ))
}

/// Decodes received bytes using the strict 7-bit wire mapping.
///
/// The high bit of every byte is masked off; printable ASCII and the
/// BEL..CR control range survive, everything else is dropped. This is
/// narrower than a full text decoding and must stay that way for wire
/// compatibility with existing clients.
pub fn decode_7bit(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for byte in bytes {
        let code = byte & 0x7F;
        match code {
            0x07..=0x0D | 0x20..=0x7E => text.push(code as char),
            _ => {}
        }
    }
    text
}

/// Expands non-printable ASCII characters into human-readable mnemonics,
/// e.g. carriage return becomes `<CR>`. Printable characters pass through
/// unchanged. Used when quoting raw wire text in logs and error responses.
pub fn expand_ascii(text: &str) -> String {
    let mut expanded = String::with_capacity(text.len());
    for c in text.chars() {
        match mnemonic(c) {
            Some(name) => expanded.push_str(name),
            None => expanded.push(c),
        }
    }
    expanded
}

fn mnemonic(c: char) -> Option<&'static str> {
    let name = match c as u32 {
        0x00 => "<NULL>",
        0x01 => "<SOH>",
        0x02 => "<STX>",
        0x03 => "<ETX>",
        0x04 => "<EOT>",
        0x05 => "<ENQ>",
        0x06 => "<ACK>",
        0x07 => "<BELL>",
        0x08 => "<BS>",
        0x09 => "<HT>",
        0x0A => "<LF>",
        0x0B => "<VT>",
        0x0C => "<FF>",
        0x0D => "<CR>",
        0x0E => "<SO>",
        0x0F => "<SI>",
        0x10 => "<DLE>",
        0x11 => "<DC1>",
        0x12 => "<DC2>",
        0x13 => "<DC3>",
        0x14 => "<DC4>",
        0x15 => "<NAK>",
        0x16 => "<SYN>",
        0x17 => "<ETB>",
        0x18 => "<CAN>",
        0x19 => "<EM>",
        0x1A => "<SUB>",
        0x1B => "<ESC>",
        0x1C => "<FS>",
        0x1D => "<GS>",
        0x1E => "<RS>",
        0x1F => "<US>",
        0x7F => "<DEL>",
        _ => return None,
    };
    Some(name)
}
