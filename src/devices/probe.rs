//! Temperature probe device.

use crate::devices::verbs;
use crate::dispatch::{Capability, CommandTarget};
use crate::protocol::{Command, ResponseBuilder};

/// A temperature probe serving a single `Temperature` verb. The reading is
/// fixed at construction; a hardware-backed probe would sample a sensor
/// here instead.
pub struct TemperatureProbe {
    device_address: String,
    celsius: f64,
}

impl TemperatureProbe {
    pub fn new(device_address: impl Into<String>, celsius: f64) -> Self {
        Self {
            device_address: device_address.into(),
            celsius,
        }
    }

    pub fn celsius(&self) -> f64 {
        self.celsius
    }
}

impl CommandTarget for TemperatureProbe {
    fn capabilities(&self) -> Vec<Capability> {
        let celsius = self.celsius;
        vec![Capability::new(
            self.device_address.clone(),
            verbs::TEMPERATURE,
            move |command: &Command| {
                let fahrenheit = 1.8 * celsius + 32.0;
                let kelvin = celsius + 273.0;
                let mut builder = ResponseBuilder::new(command);
                builder.add_payload_item("Celsius", celsius.to_string());
                builder.add_payload_item("Fahrenheit", fahrenheit.to_string());
                builder.add_payload_item("Kelvin", kelvin.to_string());
                Ok(builder.to_response())
            },
        )]
    }
}
