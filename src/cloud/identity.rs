//! Device identity resolution and auto-registration

use crate::config::CloudConfig;
use anyhow::{anyhow, bail, Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use telemetry_shared::{device_client_id, platform};
use tracing::{info, warn};

/// Credentials the device connects to the platform with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub org: String,
    pub device_type: String,
    pub device_id: String,
    pub auth_method: String,
    pub auth_token: Option<String>,
}

impl DeviceIdentity {
    /// MQTT client id of this device
    pub fn client_id(&self) -> String {
        device_client_id(&self.org, &self.device_type, &self.device_id)
    }

    /// Quickstart devices connect without credentials
    pub fn is_quickstart(&self) -> bool {
        self.org == platform::QUICKSTART_ORG
    }

    fn validate(self) -> Result<Self> {
        if self.is_quickstart() {
            return Ok(self);
        }
        if self.auth_method != "token" {
            bail!("Unsupported auth method: {}", self.auth_method);
        }
        if self.auth_token.is_none() {
            bail!("No auth token for device {}", self.device_id);
        }
        Ok(self)
    }
}

/// Outcome of a registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Newly registered, with the token issued by the platform
    Registered { auth_token: String },
    /// The device id already exists on the platform
    AlreadyRegistered,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    device_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    auth_token: String,
}

/// Registers devices through the platform's REST API
pub struct Registrar {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_token: String,
}

impl Registrar {
    /// Create a registrar for an organisation's API
    pub fn new(org: &str, api_key: String, api_token: String) -> Self {
        Self::with_base_url(
            format!("https://{}.internetofthings.ibmcloud.com/api/v0002", org),
            api_key,
            api_token,
        )
    }

    /// Create a registrar against an explicit API base URL
    pub fn with_base_url(base_url: String, api_key: String, api_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_token,
        }
    }

    /// Register a device id under a device type
    pub async fn register(&self, device_type: &str, device_id: &str) -> Result<Registration> {
        let url = format!("{}/device/types/{}/devices", self.base_url, device_type);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(&self.api_token))
            .json(&RegisterRequest { device_id })
            .send()
            .await
            .context("Registration request failed")?;

        match response.status() {
            StatusCode::CREATED => {
                let body: RegisterResponse = response
                    .json()
                    .await
                    .context("Invalid registration response")?;
                Ok(Registration::Registered {
                    auth_token: body.auth_token,
                })
            }
            StatusCode::CONFLICT => Ok(Registration::AlreadyRegistered),
            status => Err(anyhow!("Registration rejected with status {}", status)),
        }
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| anyhow!("{} must be set", name))
}

/// Resolve the device identity, registering the device when configured to
pub async fn resolve_identity(config: &CloudConfig) -> Result<DeviceIdentity> {
    let org = required(&config.org, "BLUEMIX_ORG")?;

    if !config.autoregister {
        return manual_identity(config, org);
    }

    let api_key = required(&config.api_key, "BLUEMIX_API_KEY")?;
    let api_token = required(&config.api_token, "BLUEMIX_API_TOKEN")?;
    let registrar = Registrar::new(&org, api_key, api_token);
    register_identity(config, org, &registrar).await
}

fn manual_identity(config: &CloudConfig, org: String) -> Result<DeviceIdentity> {
    let is_quickstart = org == platform::QUICKSTART_ORG;
    let device_token = if is_quickstart {
        config.device_token.clone()
    } else {
        Some(required(&config.device_token, "BLUEMIX_DEVICE_TOKEN")?)
    };

    DeviceIdentity {
        device_type: required(&config.device_type, "BLUEMIX_DEVICE_TYPE")?,
        device_id: required(&config.device_id, "BLUEMIX_DEVICE_ID")?,
        auth_method: config.auth_method.clone(),
        auth_token: device_token,
        org,
    }
    .validate()
}

async fn register_identity(
    config: &CloudConfig,
    org: String,
    registrar: &Registrar,
) -> Result<DeviceIdentity> {
    let device_type = required(&config.device_type, "BLUEMIX_DEVICE_TYPE")?;
    let device_id = required(&config.device_uuid, "RESIN_DEVICE_UUID")?;

    let auth_token = match registrar.register(&device_type, &device_id).await? {
        Registration::Registered { auth_token } => {
            info!("Registered device {} as {}", device_id, device_type);
            auth_token
        }
        Registration::AlreadyRegistered => {
            warn!("Device {} already registered, using configured token", device_id);
            config
                .device_token
                .clone()
                .context("Device already registered and BLUEMIX_DEVICE_TOKEN is not set")?
        }
    };

    DeviceIdentity {
        org,
        device_type,
        device_id,
        auth_method: config.auth_method.clone(),
        auth_token: Some(auth_token),
    }
    .validate()
}
