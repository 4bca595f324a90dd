//! Text display command handler

use super::HandlerContext;
use crate::command::CommandResult;
use serde_json::Value;
use telemetry_shared::Command;

/// Handle setText command
///
/// Requires a `text` field. Non-string values are shown in their JSON form.
pub async fn handle_set_text(ctx: &HandlerContext<'_>, command: &Command) -> CommandResult {
    let text = match command.field("text") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => {
            return CommandResult::Rejected {
                message: "missing required information: 'text'".into(),
            };
        }
    };

    match ctx.actions.display_text(&text).await {
        Ok(()) => CommandResult::Completed {
            message: format!("Displayed {} characters", text.chars().count()),
        },
        Err(e) => CommandResult::Failed {
            message: format!("Failed to display text: {:#}", e),
        },
    }
}
