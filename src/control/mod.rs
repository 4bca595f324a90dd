//! Device control actions
//!
//! This module handles:
//! - Powering the device off through the supervisor API
//! - Displaying operator text
//! - Blinking the identification LED through the supervisor API

pub mod supervisor;
pub mod traits;

pub use supervisor::SupervisorActions;
pub use traits::ControlActions;
