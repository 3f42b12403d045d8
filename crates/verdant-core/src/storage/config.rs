//! TOML-based application configuration.
//!
//! Stores the selected device provider and the task derivation thresholds.
//! Secrets (Home Assistant token, OAuth credentials) never land here; they
//! live in the OS keyring.
//!
//! Configuration is stored at `~/.config/verdant/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::tasks::TaskRules;

use super::data_dir;

/// Which device provider backs the app. Chosen once at startup;
/// business logic never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Mock,
    HomeAssistant,
    Nest,
}

/// Home Assistant connection settings. The long-lived access token is
/// read from the keyring, not from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeAssistantConfig {
    #[serde(default = "default_ha_base_url")]
    pub base_url: String,
}

/// Nest (SDM) settings. The Device Access project id is public
/// configuration; OAuth credentials live in the keyring.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NestConfig {
    #[serde(default)]
    pub project_id: String,
}

/// Provider selection plus per-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub home_assistant: HomeAssistantConfig,
    #[serde(default)]
    pub nest: NestConfig,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/verdant/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub tasks: TaskRules,
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Mock
}

fn default_ha_base_url() -> String {
    "http://homeassistant.local:8123".to_string()
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_ha_base_url(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            home_assistant: HomeAssistantConfig::default(),
            nest: NestConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing defaults on first run.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed, or if
    /// the default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, coercing the string to the
    /// existing field's type. Unknown keys are an error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.save()
    }

    fn set_json_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::MissingKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) | serde_json::Value::Null => {
                    let n = value.parse::<f64>().map_err(|e| invalid(e.to_string()))?;
                    serde_json::Number::from_f64(n)
                        .map(serde_json::Value::Number)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                }
                _ => serde_json::Value::String(value.to_string()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }
        Err(unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_mock_provider() {
        let cfg = Config::default();
        assert_eq!(cfg.provider.kind, ProviderKind::Mock);
        assert!((cfg.tasks.comfort_delta_c - 1.5).abs() < 1e-9);
        assert!(cfg.tasks.hot_cutoff_c.is_none());
    }

    #[test]
    fn get_reads_nested_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("provider.kind").as_deref(), Some("mock"));
        assert_eq!(
            cfg.get("provider.home_assistant.base_url").as_deref(),
            Some("http://homeassistant.local:8123")
        );
        assert_eq!(cfg.get("tasks.comfort_delta_c").as_deref(), Some("1.5"));
        assert!(cfg.get("no.such.key").is_none());
    }

    #[test]
    fn set_json_path_coerces_types() {
        let cfg = Config::default();
        let mut json = serde_json::to_value(&cfg).unwrap();

        Config::set_json_path(&mut json, "provider.kind", "home_assistant").unwrap();
        Config::set_json_path(&mut json, "tasks.comfort_delta_c", "2.0").unwrap();
        let cfg: Config = serde_json::from_value(json).unwrap();

        assert_eq!(cfg.provider.kind, ProviderKind::HomeAssistant);
        assert!((cfg.tasks.comfort_delta_c - 2.0).abs() < 1e-9);
    }

    #[test]
    fn set_json_path_rejects_unknown_keys() {
        let cfg = Config::default();
        let mut json = serde_json::to_value(&cfg).unwrap();
        let err = Config::set_json_path(&mut json, "provider.bogus", "1").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(_)));
    }

    #[test]
    fn toml_round_trip() {
        let mut cfg = Config::default();
        cfg.provider.kind = ProviderKind::Nest;
        cfg.provider.nest.project_id = "proj-123".to_string();
        cfg.tasks.hot_cutoff_c = Some(26.0);

        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.provider.kind, ProviderKind::Nest);
        assert_eq!(back.provider.nest.project_id, "proj-123");
        assert_eq!(back.tasks.hot_cutoff_c, Some(26.0));
    }
}
