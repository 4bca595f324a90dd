//! Supervisor API implementation of the control actions
//!
//! Shutdown and blink are best-effort: the request is sent once, the
//! response body is never read, and failures are returned to the caller
//! without retrying.

use crate::config::SupervisorConfig;
use crate::control::traits::ControlActions;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

const SHUTDOWN_PATH: &str = "/v1/shutdown";
const BLINK_PATH: &str = "/v1/blink";

/// Control actions backed by the local supervisor HTTP API
pub struct SupervisorActions {
    config: SupervisorConfig,
    client: reqwest::Client,
}

impl SupervisorActions {
    /// Create supervisor actions from the configured address and key
    pub fn new(config: SupervisorConfig) -> Result<Self> {
        // The supervisor is always local
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .context("Failed to build supervisor HTTP client")?;
        Ok(Self { config, client })
    }

    /// Full request URL for a supervisor endpoint
    pub fn endpoint(&self, path: &str) -> Result<String> {
        let address = self
            .config
            .address
            .as_deref()
            .ok_or_else(|| anyhow!("Supervisor address not configured"))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Supervisor API key not configured"))?;

        Ok(format!(
            "{}{}?apikey={}",
            address.trim_end_matches('/'),
            path,
            api_key
        ))
    }

    async fn post(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        debug!("POST {}{}", self.config.address.as_deref().unwrap_or_default(), path);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("Supervisor request to {} failed", path))?;

        response
            .error_for_status()
            .with_context(|| format!("Supervisor rejected {}", path))?;
        Ok(())
    }
}

#[async_trait]
impl ControlActions for SupervisorActions {
    async fn shut_down(&self) -> Result<()> {
        self.post(SHUTDOWN_PATH).await
    }

    async fn display_text(&self, text: &str) -> Result<()> {
        info!(target: "display", "setText: {}", text);
        Ok(())
    }

    async fn blink_indicator(&self) -> Result<()> {
        self.post(BLINK_PATH).await
    }
}
