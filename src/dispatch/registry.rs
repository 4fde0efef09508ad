//! Command Registry and Dispatcher
//!
//! The registry owns every registered capability and routes commands to
//! them. Its lifecycle has two explicit phases:
//!
//! 1. **Building** — a [`RegistryBuilder`] accepts registrations during
//!    startup. Duplicate `(device address, verb)` pairs are rejected.
//! 2. **Sealed** — [`RegistryBuilder::seal`] produces a read-only
//!    [`CommandRegistry`], shared by `Arc` across every session. No locking
//!    is needed after sealing because nothing can mutate it.
//!
//! Registration must complete before the first connection is accepted; the
//! type split makes that ordering structural rather than incidental.
//!
//! Dispatch searches capabilities in registration order: first the device
//! address must match exactly, then the verb case-insensitively. The first
//! match wins, which is deterministic because duplicates are rejected at
//! registration time.

use thiserror::Error;
use tracing::debug;

use crate::dispatch::capability::{Capability, CommandTarget, ProcessorError};
use crate::protocol::{Command, Response, ResponseBuilder};

/// Errors raised while populating the registry. Registration happens at
/// startup, so these are configuration faults, not runtime conditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A `(device address, verb)` pair was registered twice. The verb
    /// comparison is case-insensitive.
    #[error("duplicate command processor registration [device={device_address}; verb={verb}]")]
    DuplicateRegistration { device_address: String, verb: String },
}

/// Dispatch failure classification, before conversion to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LookupError {
    /// No capability is registered under the command's device address.
    UnknownDeviceAddress,
    /// The device address is known but none of its capabilities handle
    /// the command's verb.
    UnknownVerbForDevice,
}

/// The Building phase of the registry. Accumulates capabilities from device
/// collaborators, then seals into a read-only [`CommandRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    capabilities: Vec<Capability>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every capability a device collaborator exposes.
    ///
    /// The whole batch is validated before anything is inserted: if any
    /// incoming capability collides with an existing registration, or with
    /// another capability in the same batch, the call fails and the
    /// registry is left exactly as it was.
    pub fn register(&mut self, target: &dyn CommandTarget) -> Result<(), RegistryError> {
        let incoming = target.capabilities();
        for (index, capability) in incoming.iter().enumerate() {
            let collides = self
                .capabilities
                .iter()
                .chain(incoming[..index].iter())
                .any(|existing| {
                    existing.device_address() == capability.device_address()
                        && existing.verb().eq_ignore_ascii_case(capability.verb())
                });
            if collides {
                return Err(RegistryError::DuplicateRegistration {
                    device_address: capability.device_address().to_string(),
                    verb: capability.verb().to_string(),
                });
            }
        }
        self.capabilities.extend(incoming);
        Ok(())
    }

    /// Removes every registration. Intended for test setup only.
    pub fn clear(&mut self) {
        self.capabilities.clear();
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Transitions to the Sealed phase. The returned registry is read-only
    /// and safe to share across sessions without locking.
    pub fn seal(self) -> CommandRegistry {
        CommandRegistry {
            capabilities: self.capabilities,
        }
    }
}

/// The Sealed phase of the registry: the read-only set of capabilities
/// consulted by every session's dispatch calls.
#[derive(Debug)]
pub struct CommandRegistry {
    capabilities: Vec<Capability>,
}

impl CommandRegistry {
    /// Routes a command to the matching capability and returns its
    /// response.
    ///
    /// Every command-level failure is converted to an error response here:
    /// unknown device addresses are answered with the set of valid
    /// addresses, unknown verbs with the verbs valid for the addressed
    /// device, and processor failures with the error text plus command
    /// context. Nothing propagates to the caller as a fault.
    pub fn dispatch(&self, command: &Command) -> Response {
        debug!(%command, "dispatching command");
        match self.find_capability(command) {
            Ok(capability) => match capability.execute(command) {
                Ok(response) => response,
                Err(err) => Response::from_error(&err.to_string(), command),
            },
            Err(LookupError::UnknownDeviceAddress) => {
                let err = ProcessorError::new(command, "No such device address");
                let mut builder = ResponseBuilder::for_error(&err.to_string(), command);
                builder.add_payload_item("Valid addresses", self.device_addresses().join(" "));
                builder.to_response()
            }
            Err(LookupError::UnknownVerbForDevice) => {
                let err =
                    ProcessorError::new(command, "The command is not valid for the addressed device");
                let mut builder = ResponseBuilder::for_error(&err.to_string(), command);
                builder.add_payload_item(
                    "Valid commands",
                    self.verbs_for_device(command.device_address()).join(" "),
                );
                builder.to_response()
            }
        }
    }

    /// Finds the first capability, in registration order, whose device
    /// address matches exactly and whose verb matches case-insensitively.
    fn find_capability(&self, command: &Command) -> Result<&Capability, LookupError> {
        let mut device_valid = false;
        for candidate in &self.capabilities {
            if candidate.device_address() != command.device_address() {
                continue;
            }
            device_valid = true;
            if candidate.verb().eq_ignore_ascii_case(command.verb()) {
                return Ok(candidate);
            }
        }
        if device_valid {
            Err(LookupError::UnknownVerbForDevice)
        } else {
            Err(LookupError::UnknownDeviceAddress)
        }
    }

    /// Every distinct registered device address, in registration order.
    pub fn device_addresses(&self) -> Vec<&str> {
        let mut addresses: Vec<&str> = Vec::new();
        for capability in &self.capabilities {
            if !addresses.contains(&capability.device_address()) {
                addresses.push(capability.device_address());
            }
        }
        addresses
    }

    /// The verbs registered for one device address, in registration order.
    pub fn verbs_for_device(&self, device_address: &str) -> Vec<&str> {
        self.capabilities
            .iter()
            .filter(|capability| capability.device_address() == device_address)
            .map(Capability::verb)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_command;

    /// A device that acknowledges every verb it is built with and fails
    /// verbs listed as faulty.
    struct ScriptedDevice {
        device_address: String,
        verbs: Vec<&'static str>,
        faulty_verbs: Vec<&'static str>,
    }

    impl ScriptedDevice {
        fn new(device_address: &str, verbs: &[&'static str]) -> Self {
            Self {
                device_address: device_address.to_string(),
                verbs: verbs.to_vec(),
                faulty_verbs: Vec::new(),
            }
        }

        fn with_faulty(mut self, verbs: &[&'static str]) -> Self {
            self.faulty_verbs = verbs.to_vec();
            self
        }
    }

    impl CommandTarget for ScriptedDevice {
        fn capabilities(&self) -> Vec<Capability> {
            self.verbs
                .iter()
                .map(|verb| {
                    let faulty = self.faulty_verbs.contains(verb);
                    Capability::new(self.device_address.clone(), *verb, move |command| {
                        if faulty {
                            Err(ProcessorError::new(command, "device fault"))
                        } else {
                            let mut builder = ResponseBuilder::new(command);
                            builder.add_payload_item("Ack", command.verb());
                            Ok(builder.to_response())
                        }
                    })
                })
                .collect()
        }
    }

    fn registry() -> CommandRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&ScriptedDevice::new("F1", &["MoveTo", "Home", "Status"]))
            .unwrap();
        builder
            .register(&ScriptedDevice::new("T1", &["Temperature"]))
            .unwrap();
        builder.seal()
    }

    #[test]
    fn dispatch_routes_to_matching_capability() {
        let response = registry().dispatch(&parse_command("<F1,12,Home>").unwrap());
        assert_eq!(response.transaction_id(), 12);
        assert_eq!(response.payload()["Ack"], "Home");
    }

    #[test]
    fn dispatch_matches_verbs_case_insensitively() {
        let response = registry().dispatch(&parse_command("<F1,12,hOmE>").unwrap());
        assert_eq!(response.payload()["Ack"], "hOmE");
    }

    #[test]
    fn unknown_device_enumerates_addresses_only() {
        let response = registry().dispatch(&parse_command("<Z9,3,Home>").unwrap());
        assert_eq!(response.transaction_id(), 3);
        assert!(response.payload()["Error"].contains("No such device address"));
        assert_eq!(response.payload()["Valid addresses"], "F1 T1");
        assert!(!response.payload().contains_key("Valid commands"));
    }

    #[test]
    fn unknown_verb_enumerates_that_devices_verbs_only() {
        let response = registry().dispatch(&parse_command("<F1,4,Teleport>").unwrap());
        assert!(response.payload()["Error"].contains("not valid for the addressed device"));
        assert_eq!(response.payload()["Valid commands"], "MoveTo Home Status");
        assert!(!response.payload().contains_key("Valid addresses"));
    }

    #[test]
    fn processor_error_becomes_error_response() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&ScriptedDevice::new("F1", &["MoveTo"]).with_faulty(&["MoveTo"]))
            .unwrap();
        let registry = builder.seal();

        let response = registry.dispatch(&parse_command("<F1,8,MoveTo=100>").unwrap());
        assert_eq!(response.transaction_id(), 8);
        assert!(response.payload()["Error"].contains("device fault"));
        assert_eq!(response.payload()["Device"], "F1");
        assert_eq!(response.payload()["Verb"], "MoveTo");
        assert_eq!(response.payload()["Payload"], "100");
    }

    #[test]
    fn duplicate_registration_fails_and_leaves_registry_unchanged() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&ScriptedDevice::new("F1", &["MoveTo"]))
            .unwrap();

        let err = builder
            .register(&ScriptedDevice::new("F1", &["MoveTo", "Home"]))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                device_address: "F1".to_string(),
                verb: "MoveTo".to_string(),
            }
        );

        // The failed call registered nothing, including the novel verb.
        assert_eq!(builder.len(), 1);
        let registry = builder.seal();
        assert_eq!(registry.verbs_for_device("F1"), vec!["MoveTo"]);
    }

    #[test]
    fn duplicate_detection_is_case_insensitive_on_verb() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&ScriptedDevice::new("F1", &["MoveTo"]))
            .unwrap();
        assert!(builder
            .register(&ScriptedDevice::new("F1", &["MOVETO"]))
            .is_err());
    }

    #[test]
    fn duplicate_within_one_batch_is_rejected() {
        let mut builder = RegistryBuilder::new();
        assert!(builder
            .register(&ScriptedDevice::new("F1", &["Home", "Home"]))
            .is_err());
        assert!(builder.is_empty());
    }

    #[test]
    fn same_verb_on_different_devices_is_allowed() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&ScriptedDevice::new("F1", &["Version"]))
            .unwrap();
        builder
            .register(&ScriptedDevice::new("T1", &["Version"]))
            .unwrap();
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn clear_removes_all_registrations() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&ScriptedDevice::new("F1", &["Home"]))
            .unwrap();
        builder.clear();
        assert!(builder.is_empty());

        // A cleared builder accepts the same registrations again.
        builder
            .register(&ScriptedDevice::new("F1", &["Home"]))
            .unwrap();
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn device_addresses_are_distinct_and_in_registration_order() {
        let registry = registry();
        assert_eq!(registry.device_addresses(), vec!["F1", "T1"]);
    }
}
