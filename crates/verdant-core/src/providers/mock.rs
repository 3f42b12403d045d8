//! Simulated provider so the app works without any real integration.

use std::sync::Mutex;

use crate::error::ProviderError;

use super::{DeviceProvider, DeviceSnapshot, FanSpeed, Light, Thermostat};

/// In-memory device table seeded with demo devices. Actions mutate it, so
/// a turned-off light stays off for the rest of the process.
#[derive(Debug)]
pub struct MockProvider {
    state: Mutex<DeviceSnapshot>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(demo_snapshot()),
        }
    }

    /// Start from a caller-supplied device table.
    pub fn with_snapshot(snapshot: DeviceSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_snapshot() -> DeviceSnapshot {
    DeviceSnapshot {
        lights: vec![
            Light {
                id: "light-1".to_string(),
                name: "Kitchen light".to_string(),
                room: "Kitchen".to_string(),
                on: true,
            },
            Light {
                id: "light-2".to_string(),
                name: "Hallway light".to_string(),
                room: "Hallway".to_string(),
                on: false,
            },
            Light {
                id: "light-3".to_string(),
                name: "Bedroom lamp".to_string(),
                room: "Bedroom".to_string(),
                on: true,
            },
        ],
        thermostats: vec![
            Thermostat {
                id: "thermo-1".to_string(),
                name: "Living Room".to_string(),
                ambient_c: 27.3,
                setpoint_c: 26.0,
                fan: FanSpeed::High,
            },
            Thermostat {
                id: "thermo-2".to_string(),
                name: "Bedroom".to_string(),
                ambient_c: 24.8,
                setpoint_c: 24.0,
                fan: FanSpeed::Auto,
            },
        ],
    }
}

impl DeviceProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_devices(&self) -> Result<DeviceSnapshot, ProviderError> {
        Ok(self.state.lock().expect("lock poisoned").clone())
    }

    fn turn_off_light(&self, id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().expect("lock poisoned");
        let light = state
            .lights
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| ProviderError::NotFound {
                kind: "light",
                id: id.to_string(),
            })?;
        light.on = false;
        Ok(())
    }

    fn adjust_thermostat(
        &self,
        id: &str,
        setpoint_c: Option<f64>,
        fan: Option<FanSpeed>,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock().expect("lock poisoned");
        let thermostat = state
            .thermostats
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ProviderError::NotFound {
                kind: "thermostat",
                id: id.to_string(),
            })?;
        if let Some(setpoint) = setpoint_c {
            thermostat.setpoint_c = setpoint;
        }
        if let Some(fan) = fan {
            thermostat.fan = fan;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turning_a_light_off_sticks() {
        let provider = MockProvider::new();
        provider.turn_off_light("light-1").unwrap();

        let snapshot = provider.list_devices().unwrap();
        let light = snapshot.lights.iter().find(|l| l.id == "light-1").unwrap();
        assert!(!light.on);
    }

    #[test]
    fn adjusting_a_thermostat_applies_both_fields() {
        let provider = MockProvider::new();
        provider
            .adjust_thermostat("thermo-1", Some(25.0), Some(FanSpeed::Medium))
            .unwrap();

        let snapshot = provider.list_devices().unwrap();
        let t = snapshot
            .thermostats
            .iter()
            .find(|t| t.id == "thermo-1")
            .unwrap();
        assert!((t.setpoint_c - 25.0).abs() < 1e-9);
        assert_eq!(t.fan, FanSpeed::Medium);
    }

    #[test]
    fn partial_adjustment_leaves_the_other_field() {
        let provider = MockProvider::new();
        provider
            .adjust_thermostat("thermo-2", None, Some(FanSpeed::Low))
            .unwrap();

        let snapshot = provider.list_devices().unwrap();
        let t = snapshot
            .thermostats
            .iter()
            .find(|t| t.id == "thermo-2")
            .unwrap();
        assert!((t.setpoint_c - 24.0).abs() < 1e-9);
        assert_eq!(t.fan, FanSpeed::Low);
    }

    #[test]
    fn unknown_devices_are_not_found() {
        let provider = MockProvider::new();
        assert!(matches!(
            provider.turn_off_light("nope").unwrap_err(),
            ProviderError::NotFound { kind: "light", .. }
        ));
        assert!(matches!(
            provider.adjust_thermostat("nope", Some(20.0), None).unwrap_err(),
            ProviderError::NotFound {
                kind: "thermostat",
                ..
            }
        ));
    }
}
