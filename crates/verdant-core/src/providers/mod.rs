//! Smart-home device providers.
//!
//! Every provider implements [`DeviceProvider`]; the concrete one is
//! picked once at startup from configuration via [`from_config`].
//! Business logic only ever sees the trait.

pub mod home_assistant;
pub mod mock;
pub mod nest;
pub mod oauth;

pub use home_assistant::HomeAssistantProvider;
pub use mock::MockProvider;
pub use nest::NestProvider;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError, ProviderError};
use crate::storage::config::{Config, ProviderKind};

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "verdant";

    pub fn get(key: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fan speed as the providers report and accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanSpeed {
    Low,
    Medium,
    High,
    Auto,
}

impl std::fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FanSpeed::Low => "low",
            FanSpeed::Medium => "medium",
            FanSpeed::High => "high",
            FanSpeed::Auto => "auto",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for FanSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(FanSpeed::Low),
            "medium" => Ok(FanSpeed::Medium),
            "high" => Ok(FanSpeed::High),
            "auto" => Ok(FanSpeed::Auto),
            other => Err(format!("unknown fan speed '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub id: String,
    pub name: String,
    pub room: String,
    pub on: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thermostat {
    pub id: String,
    pub name: String,
    pub ambient_c: f64,
    pub setpoint_c: f64,
    pub fan: FanSpeed,
}

/// Everything a provider knows about the home, in one read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub lights: Vec<Light>,
    pub thermostats: Vec<Thermostat>,
}

/// Uniform capability interface over smart-home backends.
pub trait DeviceProvider: Send + Sync + std::fmt::Debug {
    /// Unique identifier (e.g. "mock", "home_assistant", "nest").
    fn name(&self) -> &str;

    /// Read the current device snapshot.
    fn list_devices(&self) -> Result<DeviceSnapshot, ProviderError>;

    /// Turn a light off.
    fn turn_off_light(&self, id: &str) -> Result<(), ProviderError>;

    /// Apply a new setpoint and/or fan speed to a thermostat. Fields left
    /// `None` are not touched.
    fn adjust_thermostat(
        &self,
        id: &str,
        setpoint_c: Option<f64>,
        fan: Option<FanSpeed>,
    ) -> Result<(), ProviderError>;
}

/// Build the configured provider. Called once at startup; nothing
/// downstream branches on the provider kind again.
pub fn from_config(config: &Config) -> Result<Box<dyn DeviceProvider>, CoreError> {
    match config.provider.kind {
        ProviderKind::Mock => Ok(Box::new(MockProvider::new())),
        ProviderKind::HomeAssistant => {
            let token = keyring_store::get("home_assistant_token")
                .map_err(|e| CoreError::Custom(e.to_string()))?
                .ok_or_else(|| {
                    ConfigError::MissingKey("home_assistant_token (keyring)".to_string())
                })?;
            Ok(Box::new(HomeAssistantProvider::new(
                &config.provider.home_assistant.base_url,
                &token,
            )?))
        }
        ProviderKind::Nest => {
            if config.provider.nest.project_id.is_empty() {
                return Err(ConfigError::MissingKey("provider.nest.project_id".to_string()).into());
            }
            Ok(Box::new(NestProvider::new(&config.provider.nest.project_id)?))
        }
    }
}
