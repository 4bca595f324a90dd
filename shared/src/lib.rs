//! Telemetry Shared Types
//!
//! This crate provides the wire types and codec used between the device
//! telemetry agent and the cloud IoT platform.

pub mod codec;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Platform parameters for event and command exchange
pub mod platform {
    /// Event name used for metric snapshots
    pub const EVENT_STATUS: &str = "status";

    /// Payload format for events and decodable commands
    pub const FORMAT_JSON: &str = "json";

    /// Default period between published readings, in seconds
    pub const DEFAULT_READINGS_PERIOD_SECS: u64 = 10;

    /// Default MQTT port of the platform broker
    pub const DEFAULT_MQTT_PORT: u16 = 1883;

    /// Organisation that accepts unauthenticated devices
    pub const QUICKSTART_ORG: &str = "quickstart";

    /// MQTT username for token authentication
    pub const TOKEN_AUTH_USERNAME: &str = "use-token-auth";

    /// Subscription filter matching every command in every format
    pub const COMMAND_FILTER: &str = "iot-2/cmd/+/fmt/+";
}

/// One bundle of sampled device metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// CPU utilisation percentage (0-100)
    pub cpu_load: f64,
    /// Free memory in bytes
    pub free_memory: u64,
    /// Synthetic uniform random reading
    pub random: f64,
}

/// A command delivered by the platform
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    /// Command name, e.g. `setOff`
    pub command: String,
    /// Decoded command payload
    pub data: Map<String, Value>,
}

impl Command {
    /// Create a command with the given name and payload
    pub fn new(command: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            command: command.into(),
            data,
        }
    }

    /// Look up a payload field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Topic a device publishes an event on
pub fn event_topic(event: &str, format: &str) -> String {
    format!("iot-2/evt/{}/fmt/{}", event, format)
}

/// MQTT client id for a device
pub fn device_client_id(org: &str, device_type: &str, device_id: &str) -> String {
    format!("d:{}:{}:{}", org, device_type, device_id)
}

/// Hostname of the platform's MQTT broker for an organisation
pub fn broker_host(org: &str) -> String {
    format!("{}.messaging.internetofthings.ibmcloud.com", org)
}
