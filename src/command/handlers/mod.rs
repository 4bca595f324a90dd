//! Command handlers for the supported command names

mod display;
mod indicator;
mod power;

pub use display::handle_set_text;
pub use indicator::handle_blink_led;
pub use power::handle_set_off;

use crate::control::ControlActions;

/// Command name for powering the device off
pub const SET_OFF: &str = "setOff";
/// Command name for displaying text
pub const SET_TEXT: &str = "setText";
/// Command name for blinking the identification LED
pub const BLINK_LED: &str = "blinkLed";

/// Context passed to command handlers
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub actions: &'a dyn ControlActions,
}
