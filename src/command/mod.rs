//! Command dispatch for the telemetry agent
//!
//! This module handles:
//! - Routing inbound platform commands by name
//! - Validating required command data
//! - Invoking the matching control action
//! - Reporting action failures per the configured policy

mod executor;
pub mod handlers;

pub use executor::{CommandDispatcher, CommandResult};
