//! Simulated focuser device.
//!
//! A stepper-style positioner: it tracks an integer position and exposes
//! the motion verbs as capabilities. Moves complete instantly in this
//! simulation, so `Status` always reports the motor as stopped.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use crate::devices::verbs;
use crate::dispatch::{Capability, CommandTarget, ProcessorError};
use crate::protocol::{Command, Response, ResponseBuilder};

/// A simulated focuser. One instance serves six verbs from a single
/// device address.
pub struct Focuser {
    device_address: String,
    state: Arc<FocuserState>,
}

#[derive(Debug, Default)]
struct FocuserState {
    position: AtomicI32,
}

impl Focuser {
    pub fn new(device_address: impl Into<String>) -> Self {
        Self {
            device_address: device_address.into(),
            state: Arc::new(FocuserState::default()),
        }
    }

    /// Current position in steps.
    pub fn position(&self) -> i32 {
        self.state.position.load(Ordering::Relaxed)
    }

    fn status_response(state: &FocuserState, command: &Command) -> Response {
        let mut builder = ResponseBuilder::new(command);
        builder.add_payload_item("Position", state.position.load(Ordering::Relaxed).to_string());
        builder.add_payload_item("Moving", "false");
        builder.to_response()
    }
}

impl CommandTarget for Focuser {
    fn capabilities(&self) -> Vec<Capability> {
        let address = self.device_address.clone();

        let move_to = {
            let state = Arc::clone(&self.state);
            Capability::new(address.clone(), verbs::MOVE_TO, move |command: &Command| {
                let target = command.position().ok_or_else(|| {
                    ProcessorError::new(command, "MoveTo requires a numeric target position")
                })?;
                state.position.store(target, Ordering::Relaxed);
                let mut builder = ResponseBuilder::new(command);
                builder.add_payload_item("Position", target.to_string());
                Ok(builder.to_response())
            })
        };

        let home = {
            let state = Arc::clone(&self.state);
            Capability::new(address.clone(), verbs::HOME, move |command: &Command| {
                state.position.store(0, Ordering::Relaxed);
                let mut builder = ResponseBuilder::new(command);
                builder.add_payload_item("Position", "0");
                Ok(builder.to_response())
            })
        };

        let stop = {
            let state = Arc::clone(&self.state);
            Capability::new(address.clone(), verbs::STOP, move |command: &Command| {
                Ok(Focuser::status_response(&state, command))
            })
        };

        let release = Capability::new(address.clone(), verbs::RELEASE, |command: &Command| {
            // De-energizes the motor; nothing to report beyond the ack.
            Ok(Response::from_successful_command(command))
        });

        let status = {
            let state = Arc::clone(&self.state);
            Capability::new(address.clone(), verbs::STATUS, move |command: &Command| {
                Ok(Focuser::status_response(&state, command))
            })
        };

        let version = Capability::new(address, verbs::VERSION, |command: &Command| {
            if command.has_payload() {
                return Err(ProcessorError::new(command, "Version is read-only"));
            }
            let mut builder = ResponseBuilder::new(command);
            builder.add_payload_item("Version", crate::VERSION);
            Ok(builder.to_response())
        });

        vec![move_to, home, stop, release, status, version]
    }
}
