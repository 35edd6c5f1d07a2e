//! Configuration management for the lift-call client.
//!
//! Layers, each overriding the previous:
//! 1. Compiled defaults ([`Config::default_config`])
//! 2. Optional TOML file ([`Config::from_file`])
//! 3. Environment variables ([`Config::apply_env`])

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder left in place when `CLIENT_ID` was never set.
pub const CLIENT_ID_PLACEHOLDER: &str = "YOUR_CLIENT_ID";
/// Placeholder left in place when `CLIENT_SECRET` was never set.
pub const CLIENT_SECRET_PLACEHOLDER: &str = "YOUR_CLIENT_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub gateway: GatewayConfig,
    pub call: CallConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host serving both the token endpoint and the WebSocket stream
    pub api_host: String,
    pub building_id: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CallConfig {
    /// Delay between receiving a session id and sending its cancel
    pub cancel_delay_ms: u64,
    /// Upper bound on waiting for a session id; `None` waits until the stream closes
    pub session_wait_timeout_ms: Option<u64>,
}

/// Local call policy applied before anything is sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    pub disabled_actions: Vec<i32>,
    pub invalid_direction_actions: Vec<i32>,
    pub min_delay_seconds: i32,
    pub max_delay_seconds: i32,
    pub max_group_size: i32,
    pub valid_areas: Vec<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            client_id: CLIENT_ID_PLACEHOLDER.to_string(),
            client_secret: CLIENT_SECRET_PLACEHOLDER.to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_host: "dev.kone.com".to_string(),
            building_id: String::new(),
            group_id: "1".to_string(),
        }
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            cancel_delay_ms: 2000,
            session_wait_timeout_ms: None,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            disabled_actions: vec![4],
            invalid_direction_actions: vec![2002],
            min_delay_seconds: 0,
            max_delay_seconds: 30,
            max_group_size: 9,
            valid_areas: vec![1000, 2000, 3000, 4000, 5000],
        }
    }
}

impl GatewayConfig {
    /// Building identifier as the gateway expects it (`building:<id>`).
    pub fn target_building_id(&self) -> String {
        format!("building:{}", self.building_id)
    }

    /// OAuth scopes needed to place calls in the configured group.
    pub fn token_scopes(&self) -> Vec<String> {
        vec![
            "application/inventory".to_string(),
            format!("callgiving/group:{}:{}", self.building_id, self.group_id),
        ]
    }
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            credentials: CredentialsConfig::default(),
            gateway: GatewayConfig::default(),
            call: CallConfig::default(),
            policy: PolicyConfig::default(),
        }
    }

    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            #[cfg(feature = "toml")]
            Some(path) => Self::from_file(path)?,
            #[cfg(not(feature = "toml"))]
            Some(_) => {
                return Err(ConfigError::Invalid {
                    key: "--config",
                    value: "file configuration needs the `toml` feature".to_string(),
                })
            }
            None => Self::default_config(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CLIENT_ID") {
            self.credentials.client_id = v;
        }
        if let Some(v) = lookup("CLIENT_SECRET") {
            self.credentials.client_secret = v;
        }
        if let Some(v) = lookup("BUILDING_ID") {
            self.gateway.building_id = v;
        }
        if let Some(v) = lookup("GROUP_ID") {
            self.gateway.group_id = v;
        }
        if let Some(v) = lookup("KONE_API_HOST") {
            self.gateway.api_host = v;
        }
        if let Some(v) = lookup("CANCEL_DELAY_MS") {
            self.call.cancel_delay_ms = parse_number("CANCEL_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("SESSION_WAIT_TIMEOUT_MS") {
            self.call.session_wait_timeout_ms = Some(parse_number("SESSION_WAIT_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("VALID_AREAS") {
            self.policy.valid_areas = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_number("VALID_AREAS", s))
                .collect::<Result<Vec<i32>>>()?;
        }
        Ok(())
    }

    /// Reject empty or placeholder credentials before any network traffic.
    pub fn validate_credentials(&self) -> Result<()> {
        let creds = &self.credentials;
        if creds.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("CLIENT_ID"));
        }
        if creds.client_id == CLIENT_ID_PLACEHOLDER {
            return Err(ConfigError::Placeholder("CLIENT_ID"));
        }
        if creds.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("CLIENT_SECRET"));
        }
        if creds.client_secret == CLIENT_SECRET_PLACEHOLDER {
            return Err(ConfigError::Placeholder("CLIENT_SECRET"));
        }
        if self.gateway.building_id.trim().is_empty() {
            return Err(ConfigError::Missing("BUILDING_ID"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}
