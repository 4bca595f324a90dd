//! Power-off command handler

use super::HandlerContext;
use crate::command::CommandResult;
use telemetry_shared::Command;

/// Handle setOff command
///
/// The supervisor powers the device down, so a success here is usually the
/// last thing the agent logs.
pub async fn handle_set_off(ctx: &HandlerContext<'_>, _command: &Command) -> CommandResult {
    match ctx.actions.shut_down().await {
        Ok(()) => CommandResult::Completed {
            message: "Shutdown requested".into(),
        },
        Err(e) => CommandResult::Failed {
            message: format!("Failed to shut down: {:#}", e),
        },
    }
}
