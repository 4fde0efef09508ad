//! Command Processor Capability Contract
//!
//! A [`Capability`] is the unit of registration: one device address plus one
//! verb, bound to an execute function. Device collaborators implement
//! [`CommandTarget`] and hand the registry a list of capability records;
//! there is no processor inheritance hierarchy, just data plus a boxed
//! function.

use std::fmt;

use thiserror::Error;

use crate::protocol::{Command, Response};

/// The execute function bound into a capability. Synchronous from the
/// dispatcher's point of view: a processor must not suspend the calling
/// session indefinitely; any internal waiting is bounded and is the device
/// collaborator's concern.
pub type ProcessorFn = Box<dyn Fn(&Command) -> Result<Response, ProcessorError> + Send + Sync>;

/// A command-level failure raised by a processor's execute function.
///
/// Always recovered by the dispatcher into an error response; never allowed
/// to surface as a transport fault. The message carries the command context
/// so the client can correlate the failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} [transaction={transaction_id}; device={device_address}; verb={verb}]")]
pub struct ProcessorError {
    message: String,
    transaction_id: i32,
    device_address: String,
    verb: String,
}

impl ProcessorError {
    pub fn new(command: &Command, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transaction_id: command.transaction_id(),
            device_address: command.device_address().to_string(),
            verb: command.verb().to_string(),
        }
    }
}

/// One registered device+verb combination bound to an execution function.
pub struct Capability {
    device_address: String,
    verb: String,
    execute: ProcessorFn,
}

impl Capability {
    pub fn new(
        device_address: impl Into<String>,
        verb: impl Into<String>,
        execute: impl Fn(&Command) -> Result<Response, ProcessorError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            device_address: device_address.into(),
            verb: verb.into(),
            execute: Box::new(execute),
        }
    }

    /// The device address this capability serves. Exact-match key.
    pub fn device_address(&self) -> &str {
        &self.device_address
    }

    /// The verb this capability handles. Matched case-insensitively.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Executes the command. The dispatcher has already verified that the
    /// device address and verb match this capability.
    pub fn execute(&self, command: &Command) -> Result<Response, ProcessorError> {
        (self.execute)(command)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("device_address", &self.device_address)
            .field("verb", &self.verb)
            .finish_non_exhaustive()
    }
}

/// A device collaborator that can enumerate its capabilities. One target
/// may serve any number of verbs, each as its own capability record.
pub trait CommandTarget {
    fn capabilities(&self) -> Vec<Capability>;
}
