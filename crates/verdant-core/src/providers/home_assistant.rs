//! Home Assistant provider -- the fastest real-world path.
//!
//! Talks to a Home Assistant instance over its REST API using a
//! long-lived access token. Lights come from `light.*` entities,
//! thermostats from `climate.*`; actions go through service calls.

use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::error::ProviderError;

use super::{DeviceProvider, DeviceSnapshot, FanSpeed, Light, Thermostat};

#[derive(Debug)]
pub struct HomeAssistantProvider {
    base_url: String,
    token: String,
    client: Client,
    rt: tokio::runtime::Runtime,
}

#[derive(Debug, Deserialize)]
struct EntityState {
    entity_id: String,
    state: String,
    #[serde(default)]
    attributes: serde_json::Value,
}

impl HomeAssistantProvider {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ProviderError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: Client::new(),
            rt,
        })
    }

    fn states(&self) -> Result<Vec<EntityState>, ProviderError> {
        let url = format!("{}/api/states", self.base_url);
        self.rt.block_on(async {
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;
            check(resp).await?.json().await.map_err(Into::into)
        })
    }

    fn call_service(
        &self,
        domain: &str,
        service: &str,
        body: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let url = format!("{}/api/services/{domain}/{service}", self.base_url);
        self.rt.block_on(async {
            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&body)
                .send()
                .await?;
            check(resp).await?;
            Ok(())
        })
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
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_default();
    Err(ProviderError::Http {
        provider: "home_assistant",
        status,
        message,
    })
}

fn attr_str<'a>(attributes: &'a serde_json::Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| attributes.get(k).and_then(|v| v.as_str()))
}

fn attr_f64(attributes: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| attributes.get(k).and_then(|v| v.as_f64()))
}

fn snapshot_from_states(states: Vec<EntityState>) -> DeviceSnapshot {
    let mut snapshot = DeviceSnapshot::default();
    for entity in states {
        let domain = entity.entity_id.split('.').next().unwrap_or_default();
        match domain {
            "light" => {
                let name = attr_str(&entity.attributes, &["friendly_name"])
                    .unwrap_or(&entity.entity_id)
                    .to_string();
                let room = attr_str(&entity.attributes, &["room_name", "area"])
                    .unwrap_or_default()
                    .to_string();
                snapshot.lights.push(Light {
                    id: entity.entity_id,
                    name,
                    room,
                    on: entity.state == "on",
                });
            }
            "climate" => {
                // No temperature reading means nothing to derive from.
                let Some(ambient_c) = attr_f64(&entity.attributes, &["current_temperature"])
                else {
                    continue;
                };
                // No setpoint exposed: treat the reading as the target.
                let setpoint_c = attr_f64(
                    &entity.attributes,
                    &["temperature", "target_temp_low", "target_temp_high"],
                )
                .unwrap_or(ambient_c);
                let fan = attr_str(&entity.attributes, &["fan_mode", "fan_state"])
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(FanSpeed::Auto);
                let name = attr_str(&entity.attributes, &["friendly_name"])
                    .unwrap_or(&entity.entity_id)
                    .to_string();
                snapshot.thermostats.push(Thermostat {
                    id: entity.entity_id,
                    name,
                    ambient_c,
                    setpoint_c,
                    fan,
                });
            }
            _ => {}
        }
    }
    snapshot
}

impl DeviceProvider for HomeAssistantProvider {
    fn name(&self) -> &str {
        "home_assistant"
    }

    fn list_devices(&self) -> Result<DeviceSnapshot, ProviderError> {
        Ok(snapshot_from_states(self.states()?))
    }

    fn turn_off_light(&self, id: &str) -> Result<(), ProviderError> {
        self.call_service("light", "turn_off", json!({ "entity_id": id }))
    }

    fn adjust_thermostat(
        &self,
        id: &str,
        setpoint_c: Option<f64>,
        fan: Option<FanSpeed>,
    ) -> Result<(), ProviderError> {
        if let Some(temperature) = setpoint_c {
            self.call_service(
                "climate",
                "set_temperature",
                json!({ "entity_id": id, "temperature": temperature }),
            )?;
        }
        if let Some(fan) = fan {
            self.call_service(
                "climate",
                "set_fan_mode",
                json!({ "entity_id": id, "fan_mode": fan.to_string() }),
            )?;
        }
        Ok(())
    }
}
