//! Agent configuration
//!
//! All settings are read once from the environment at startup and never
//! re-read. Parsing is lenient: malformed optional values fall back to their
//! defaults, and identity fields are only validated when the device identity
//! is resolved.

use std::str::FromStr;
use telemetry_shared::platform;
use tracing::warn;

/// How failed control actions are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Report failures at warn level
    #[default]
    Log,
    /// Only trace failures at debug level
    Ignore,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(FailurePolicy::Log),
            "ignore" => Ok(FailurePolicy::Ignore),
            other => Err(format!("unknown failure policy: {}", other)),
        }
    }
}

/// Supervisor control API settings
#[derive(Debug, Clone, Default)]
pub struct SupervisorConfig {
    /// Base URL of the supervisor, e.g. `http://127.0.0.1:48484`
    pub address: Option<String>,
    /// API key appended to every request
    pub api_key: Option<String>,
}

/// Cloud platform settings
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// Register the device automatically instead of using a manual identity
    pub autoregister: bool,
    pub org: Option<String>,
    pub device_type: Option<String>,
    pub device_id: Option<String>,
    pub device_token: Option<String>,
    pub auth_method: String,
    /// Application API key used for registration
    pub api_key: Option<String>,
    /// Application API token used for registration
    pub api_token: Option<String>,
    /// Device UUID used as the device id when registering
    pub device_uuid: Option<String>,
    pub mqtt_port: u16,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            autoregister: true,
            org: None,
            device_type: None,
            device_id: None,
            device_token: None,
            auth_method: "token".into(),
            api_key: None,
            api_token: None,
            device_uuid: None,
            mqtt_port: platform::DEFAULT_MQTT_PORT,
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub supervisor: SupervisorConfig,
    pub cloud: CloudConfig,
    /// Seconds between published readings, always >= 1
    pub readings_period_secs: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            cloud: CloudConfig::default(),
            readings_period_secs: platform::DEFAULT_READINGS_PERIOD_SECS,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AgentConfig {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let defaults = CloudConfig::default();

        let failure_policy = match get(&["ACTION_FAILURE_POLICY"]) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, using default", e);
                FailurePolicy::default()
            }),
            None => FailurePolicy::default(),
        };

        let mqtt_port = match get(&["BLUEMIX_MQTT_PORT"]) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Invalid BLUEMIX_MQTT_PORT {:?}, using {}", raw, defaults.mqtt_port);
                defaults.mqtt_port
            }),
            None => defaults.mqtt_port,
        };

        Self {
            supervisor: SupervisorConfig {
                address: get(&["SUPERVISOR_ADDRESS", "RESIN_SUPERVISOR_ADDRESS"]),
                api_key: get(&["SUPERVISOR_API_KEY", "RESIN_SUPERVISOR_API_KEY"]),
            },
            cloud: CloudConfig {
                autoregister: get(&["BLUEMIX_AUTOREGISTER"]).map_or(true, |v| v == "1"),
                org: get(&["BLUEMIX_ORG"]),
                device_type: get(&["BLUEMIX_DEVICE_TYPE"]),
                device_id: get(&["BLUEMIX_DEVICE_ID"]),
                device_token: get(&["BLUEMIX_DEVICE_TOKEN"]),
                auth_method: get(&["BLUEMIX_AUTH_METHOD"]).unwrap_or(defaults.auth_method),
                api_key: get(&["BLUEMIX_API_KEY"]),
                api_token: get(&["BLUEMIX_API_TOKEN"]),
                device_uuid: get(&["RESIN_DEVICE_UUID", "BALENA_DEVICE_UUID"]),
                mqtt_port,
            },
            readings_period_secs: parse_period(get(&["READINGS_PERIOD"]).as_deref()),
            failure_policy,
        }
    }
}

/// Parse the readings period, falling back to the default on bad input
pub fn parse_period(raw: Option<&str>) -> u64 {
    let default = platform::DEFAULT_READINGS_PERIOD_SECS;
    match raw.map(|s| s.trim().parse::<u64>()) {
        None => default,
        Some(Ok(0)) => {
            warn!("READINGS_PERIOD must be at least 1, using {}s", default);
            default
        }
        Some(Ok(period)) => period,
        Some(Err(_)) => {
            warn!("Invalid READINGS_PERIOD {:?}, using {}s", raw.unwrap_or_default(), default);
            default
        }
    }
}
