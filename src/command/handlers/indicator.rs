//! Identification LED command handler

use super::HandlerContext;
use crate::command::CommandResult;
use telemetry_shared::Command;

/// Handle blinkLed command
pub async fn handle_blink_led(ctx: &HandlerContext<'_>, _command: &Command) -> CommandResult {
    match ctx.actions.blink_indicator().await {
        Ok(()) => CommandResult::Completed {
            message: "Blink requested".into(),
        },
        Err(e) => CommandResult::Failed {
            message: format!("Failed to blink LED: {:#}", e),
        },
    }
}
