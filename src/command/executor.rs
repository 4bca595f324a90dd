//! Command dispatcher - validates and routes incoming commands

use super::handlers::{self, HandlerContext};
use crate::config::FailurePolicy;
use crate::control::ControlActions;
use std::sync::Arc;
use telemetry_shared::Command;
use tracing::{debug, error, info, warn};

/// Result of command dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Action invoked successfully
    Completed { message: String },
    /// Action invoked but failed
    Failed { message: String },
    /// Command data invalid, no action taken
    Rejected { message: String },
    /// Command name not recognised, no action taken
    Ignored,
}

/// Routes commands from the platform to control actions
pub struct CommandDispatcher {
    actions: Arc<dyn ControlActions>,
    failure_policy: FailurePolicy,
}

impl CommandDispatcher {
    /// Create a new command dispatcher
    pub fn new(actions: Arc<dyn ControlActions>, failure_policy: FailurePolicy) -> Self {
        Self {
            actions,
            failure_policy,
        }
    }

    /// Dispatch one command and wait for its action to finish
    ///
    /// Every call runs the action again; nothing is deduplicated.
    pub async fn dispatch(&self, command: &Command) -> CommandResult {
        info!("Command received: {}", command.command);

        let ctx = HandlerContext {
            actions: self.actions.as_ref(),
        };

        let result = match command.command.as_str() {
            handlers::SET_OFF => handlers::handle_set_off(&ctx, command).await,
            handlers::SET_TEXT => handlers::handle_set_text(&ctx, command).await,
            handlers::BLINK_LED => handlers::handle_blink_led(&ctx, command).await,
            _ => CommandResult::Ignored,
        };

        match &result {
            CommandResult::Completed { message } => {
                debug!("  Command completed: {}", message);
            }
            CommandResult::Failed { message } => match self.failure_policy {
                FailurePolicy::Log => warn!("  Command failed: {}", message),
                FailurePolicy::Ignore => debug!("  Command failed: {}", message),
            },
            CommandResult::Rejected { message } => {
                error!("Error - command is {}", message);
            }
            CommandResult::Ignored => {
                warn!("  Unknown command ignored: {}", command.command);
            }
        }

        result
    }
}
