//! Cloud connection traits

use anyhow::Result;
use async_trait::async_trait;
use telemetry_shared::MetricSnapshot;

/// Outbound side of the cloud connection
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a snapshot as a JSON event with the given name
    async fn publish_event(&self, event: &str, snapshot: &MetricSnapshot) -> Result<()>;
}
