//! Nest thermostat provider via the Google Smart Device Management API.
//!
//! Requires enrollment in a Device Access project; the project id comes
//! from configuration, OAuth client credentials and tokens from the OS
//! keyring. Google exposes no public light control to third-party apps,
//! so this provider reports thermostats only.

use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::error::{OAuthError, ProviderError};

use super::oauth::{self, OAuthConfig};
use super::{keyring_store, DeviceProvider, DeviceSnapshot, FanSpeed, Thermostat};

const SDM_API_BASE: &str = "https://smartdevicemanagement.googleapis.com/v1";
const THERMOSTAT_TYPE: &str = "sdm.devices.types.THERMOSTAT";

#[derive(Debug)]
pub struct NestProvider {
    project_id: String,
    client_id: String,
    client_secret: String,
    api_base: String,
    client: Client,
    rt: tokio::runtime::Runtime,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<SdmDevice>,
}

#[derive(Debug, Deserialize)]
struct SdmDevice {
    name: String,
    #[serde(rename = "type")]
    device_type: String,
    #[serde(default)]
    traits: serde_json::Value,
}

impl NestProvider {
    /// Load OAuth client credentials from the keyring (empty if not linked
    /// yet; calls fail with a not-authenticated error until they are).
    pub fn new(project_id: &str) -> Result<Self, ProviderError> {
        let client_id = keyring_store::get("nest_client_id")
            .ok()
            .flatten()
            .unwrap_or_default();
        let client_secret = keyring_store::get("nest_client_secret")
            .ok()
            .flatten()
            .unwrap_or_default();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            project_id: project_id.to_string(),
            client_id,
            client_secret,
            api_base: SDM_API_BASE.to_string(),
            client: Client::new(),
            rt,
        })
    }

    /// Persist OAuth client credentials to the OS keyring.
    pub fn set_credentials(client_id: &str, client_secret: &str) -> Result<(), OAuthError> {
        keyring_store::set("nest_client_id", client_id)
            .map_err(|e| OAuthError::AuthorizationFailed(e.to_string()))?;
        keyring_store::set("nest_client_secret", client_secret)
            .map_err(|e| OAuthError::AuthorizationFailed(e.to_string()))
    }

    fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            service_name: "nest".to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: format!(
                "https://nestservices.google.com/partnerconnections/{}/auth",
                self.project_id
            ),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/sdm.service".to_string()],
            redirect_port: 19824,
        }
    }

    /// Run the OAuth consent flow and store the resulting tokens.
    pub fn link(&self) -> Result<(), OAuthError> {
        self.rt.block_on(oauth::authorize(&self.oauth_config()))?;
        Ok(())
    }

    /// Drop stored tokens.
    pub fn unlink() -> Result<(), OAuthError> {
        oauth::clear_tokens("nest")
    }

    pub fn is_linked() -> bool {
        oauth::load_tokens("nest").is_some()
    }

    /// Return a valid access token, refreshing if expired.
    fn access_token(&self) -> Result<String, OAuthError> {
        let tokens = oauth::load_tokens("nest").ok_or(OAuthError::NotAuthenticated {
            service: "nest".to_string(),
        })?;

        if !oauth::is_expired(&tokens) {
            return Ok(tokens.access_token);
        }

        let refresh = tokens.refresh_token.ok_or(OAuthError::TokenExpired)?;
        let refreshed = self
            .rt
            .block_on(oauth::refresh_token(&self.oauth_config(), &refresh))?;
        Ok(refreshed.access_token)
    }

    fn execute_command(&self, device: &str, body: serde_json::Value) -> Result<(), ProviderError> {
        let token = self.access_token().map_err(provider_auth_error)?;
        let url = format!("{}/{device}:executeCommand", self.api_base);
        self.rt.block_on(async {
            let resp = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?;
            check(resp).await?;
            Ok(())
        })
    }
}

fn provider_auth_error(err: OAuthError) -> ProviderError {
    ProviderError::Http {
        provider: "nest",
        status: 401,
        message: err.to_string(),
    }
}

async fn check(resp: Response) -> Result<Response, ProviderError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_default();
    Err(ProviderError::Http {
        provider: "nest",
        status,
        message,
    })
}

fn trait_f64(traits: &serde_json::Value, name: &str, field: &str) -> Option<f64> {
    traits.get(name).and_then(|t| t.get(field)).and_then(|v| v.as_f64())
}

fn trait_str<'a>(traits: &'a serde_json::Value, name: &str, field: &str) -> Option<&'a str> {
    traits.get(name).and_then(|t| t.get(field)).and_then(|v| v.as_str())
}

fn snapshot_from_devices(devices: Vec<SdmDevice>) -> DeviceSnapshot {
    let mut snapshot = DeviceSnapshot::default();
    for device in devices {
        if device.device_type != THERMOSTAT_TYPE {
            continue;
        }
        let Some(ambient_c) = trait_f64(
            &device.traits,
            "sdm.devices.traits.Temperature",
            "ambientTemperatureCelsius",
        ) else {
            continue;
        };
        let setpoint_c = trait_f64(
            &device.traits,
            "sdm.devices.traits.ThermostatTemperatureSetpoint",
            "coolCelsius",
        )
        .or_else(|| {
            trait_f64(
                &device.traits,
                "sdm.devices.traits.ThermostatTemperatureSetpoint",
                "heatCelsius",
            )
        })
        .unwrap_or(ambient_c);
        // SDM models the fan as a timer, not a speed.
        let fan = match trait_str(&device.traits, "sdm.devices.traits.Fan", "timerMode") {
            Some("ON") => FanSpeed::High,
            _ => FanSpeed::Auto,
        };
        let name = trait_str(&device.traits, "sdm.devices.traits.Info", "customName")
            .filter(|s| !s.is_empty())
            .unwrap_or(&device.name)
            .to_string();
        snapshot.thermostats.push(Thermostat {
            // The full resource path doubles as the command target.
            id: device.name,
            name,
            ambient_c,
            setpoint_c,
            fan,
        });
    }
    snapshot
}

impl DeviceProvider for NestProvider {
    fn name(&self) -> &str {
        "nest"
    }

    fn list_devices(&self) -> Result<DeviceSnapshot, ProviderError> {
        let token = self.access_token().map_err(provider_auth_error)?;
        let url = format!("{}/enterprises/{}/devices", self.api_base, self.project_id);
        let response: DevicesResponse = self.rt.block_on(async {
            let resp = self.client.get(&url).bearer_auth(&token).send().await?;
            check(resp).await?.json().await.map_err(ProviderError::from)
        })?;
        Ok(snapshot_from_devices(response.devices))
    }

    fn turn_off_light(&self, _id: &str) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported {
            provider: "nest",
            capability: "lights",
        })
    }

    fn adjust_thermostat(
        &self,
        id: &str,
        setpoint_c: Option<f64>,
        fan: Option<FanSpeed>,
    ) -> Result<(), ProviderError> {
        if let Some(cool_c) = setpoint_c {
            self.execute_command(
                id,
                json!({
                    "command": "sdm.devices.commands.ThermostatTemperatureSetpoint.SetCool",
                    "params": { "coolCelsius": cool_c }
                }),
            )?;
        }
        if let Some(fan) = fan {
            let params = match fan {
                FanSpeed::Auto => json!({ "timerMode": "OFF" }),
                _ => json!({ "timerMode": "ON", "duration": "900s" }),
            };
            self.execute_command(
                id,
                json!({
                    "command": "sdm.devices.commands.Fan.SetTimer",
                    "params": params
                }),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_devices() -> Vec<SdmDevice> {
        serde_json::from_value(json!([
            {
                "name": "enterprises/p1/devices/AVPHw-therm",
                "type": "sdm.devices.types.THERMOSTAT",
                "traits": {
                    "sdm.devices.traits.Info": { "customName": "Hallway" },
                    "sdm.devices.traits.Temperature": { "ambientTemperatureCelsius": 27.1 },
                    "sdm.devices.traits.ThermostatTemperatureSetpoint": { "coolCelsius": 25.5 },
                    "sdm.devices.traits.Fan": { "timerMode": "ON" }
                }
            },
            {
                "name": "enterprises/p1/devices/AVPHw-cam",
                "type": "sdm.devices.types.CAMERA",
                "traits": {}
            },
            {
                "name": "enterprises/p1/devices/AVPHw-bare",
                "type": "sdm.devices.types.THERMOSTAT",
                "traits": {
                    "sdm.devices.traits.Info": { "customName": "" }
                }
            }
        ]))
        .unwrap()
    }

    #[test]
    fn maps_thermostats_and_skips_the_rest() {
        let snapshot = snapshot_from_devices(sample_devices());
        assert!(snapshot.lights.is_empty());
        // The camera and the reading-less thermostat are dropped.
        assert_eq!(snapshot.thermostats.len(), 1);

        let t = &snapshot.thermostats[0];
        assert_eq!(t.id, "enterprises/p1/devices/AVPHw-therm");
        assert_eq!(t.name, "Hallway");
        assert!((t.ambient_c - 27.1).abs() < 1e-9);
        assert!((t.setpoint_c - 25.5).abs() < 1e-9);
        assert_eq!(t.fan, FanSpeed::High);
    }

    #[test]
    fn lights_are_unsupported() {
        let provider = NestProvider::new("p1").unwrap();
        assert!(matches!(
            provider.turn_off_light("any").unwrap_err(),
            ProviderError::Unsupported {
                provider: "nest",
                capability: "lights",
            }
        ));
    }
}
