//! Control action trait for pluggable device backends

use anyhow::Result;
use async_trait::async_trait;

/// Side-effecting device controls invoked by commands
#[async_trait]
pub trait ControlActions: Send + Sync {
    /// Power the device off
    async fn shut_down(&self) -> Result<()>;

    /// Show text to the operator
    async fn display_text(&self, text: &str) -> Result<()>;

    /// Blink the device identification indicator
    async fn blink_indicator(&self) -> Result<()>;
}
