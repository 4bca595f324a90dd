//! Cloud platform connection
//!
//! This module handles:
//! - Resolving the device identity, registering the device when enabled
//! - The MQTT connection used to publish events
//! - Decoding inbound commands into events for the dispatcher

mod connection;
mod identity;
mod traits;

pub use connection::{connect, CloudEvent};
pub use identity::resolve_identity;
pub use traits::Publisher;
