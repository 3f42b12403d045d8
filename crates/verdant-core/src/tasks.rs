//! Energy-saving task derivation.
//!
//! A pure mapping from a device snapshot to actionable nudges: lights left
//! on, rooms running hotter than their setpoint. No stored state; the
//! thresholds come in as [`TaskRules`] from configuration.

use serde::{Deserialize, Serialize};

use crate::providers::{DeviceSnapshot, FanSpeed};

/// Setpoint suggestions stay inside this comfort band.
const SETPOINT_FLOOR_C: f64 = 18.0;
const SETPOINT_CEILING_C: f64 = 25.0;

/// Deployment policy for when a thermostat counts as "running hot".
///
/// With `hot_cutoff_c` unset, a room is hot when the ambient reading
/// exceeds the setpoint by more than `comfort_delta_c`. With it set, the
/// fixed cutoff wins regardless of setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskRules {
    #[serde(default = "default_comfort_delta")]
    pub comfort_delta_c: f64,
    #[serde(default)]
    pub hot_cutoff_c: Option<f64>,
}

fn default_comfort_delta() -> f64 {
    1.5
}

impl Default for TaskRules {
    fn default() -> Self {
        Self {
            comfort_delta_c: default_comfort_delta(),
            hot_cutoff_c: None,
        }
    }
}

/// An actionable suggestion derived from device state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// A light is on; suggest turning it off.
    TurnOffLight {
        device_id: String,
        name: String,
        room: String,
    },
    /// A room reads hot; suggest cooling toward the comfort band.
    CoolRoom {
        device_id: String,
        name: String,
        ambient_c: f64,
        suggested_setpoint_c: f64,
        current_fan: FanSpeed,
    },
}

impl Task {
    pub fn device_id(&self) -> &str {
        match self {
            Task::TurnOffLight { device_id, .. } | Task::CoolRoom { device_id, .. } => device_id,
        }
    }
}

/// Derive the task list for a snapshot. Pure; call it as often as the
/// presentation layer wants fresh suggestions.
pub fn derive_tasks(snapshot: &DeviceSnapshot, rules: &TaskRules) -> Vec<Task> {
    let mut tasks = Vec::new();

    for light in &snapshot.lights {
        if light.on {
            tasks.push(Task::TurnOffLight {
                device_id: light.id.clone(),
                name: light.name.clone(),
                room: light.room.clone(),
            });
        }
    }

    for thermostat in &snapshot.thermostats {
        let hot = match rules.hot_cutoff_c {
            Some(cutoff) => thermostat.ambient_c > cutoff,
            None => thermostat.ambient_c > thermostat.setpoint_c + rules.comfort_delta_c,
        };
        if hot {
            tasks.push(Task::CoolRoom {
                device_id: thermostat.id.clone(),
                name: thermostat.name.clone(),
                ambient_c: thermostat.ambient_c,
                suggested_setpoint_c: suggested_setpoint(thermostat.ambient_c),
                current_fan: thermostat.fan,
            });
        }
    }

    tasks
}

/// Nudge toward comfortable and efficient: one degree below ambient,
/// clamped to the comfort band.
pub fn suggested_setpoint(ambient_c: f64) -> f64 {
    (ambient_c - 1.0).clamp(SETPOINT_FLOOR_C, SETPOINT_CEILING_C)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Light, Thermostat};

    fn snapshot() -> DeviceSnapshot {
        DeviceSnapshot {
            lights: vec![
                Light {
                    id: "light-1".into(),
                    name: "Kitchen light".into(),
                    room: "Kitchen".into(),
                    on: true,
                },
                Light {
                    id: "light-2".into(),
                    name: "Hallway light".into(),
                    room: "Hallway".into(),
                    on: false,
                },
            ],
            thermostats: vec![
                Thermostat {
                    id: "thermo-1".into(),
                    name: "Living Room".into(),
                    ambient_c: 27.3,
                    setpoint_c: 26.0,
                    fan: FanSpeed::High,
                },
                Thermostat {
                    id: "thermo-2".into(),
                    name: "Bedroom".into(),
                    ambient_c: 24.8,
                    setpoint_c: 24.0,
                    fan: FanSpeed::Auto,
                },
            ],
        }
    }

    #[test]
    fn only_lights_that_are_on_yield_tasks() {
        let tasks = derive_tasks(&snapshot(), &TaskRules::default());
        let light_tasks: Vec<_> = tasks
            .iter()
            .filter(|t| matches!(t, Task::TurnOffLight { .. }))
            .collect();
        assert_eq!(light_tasks.len(), 1);
        assert_eq!(light_tasks[0].device_id(), "light-1");
    }

    #[test]
    fn delta_rule_flags_rooms_over_setpoint() {
        // Living room: 27.3 > 26.0 + 1.5 is false; bedroom: 24.8 > 25.5 false.
        let tasks = derive_tasks(&snapshot(), &TaskRules::default());
        assert!(tasks.iter().all(|t| matches!(t, Task::TurnOffLight { .. })));

        // A tighter delta flags the living room.
        let rules = TaskRules {
            comfort_delta_c: 1.0,
            hot_cutoff_c: None,
        };
        let tasks = derive_tasks(&snapshot(), &rules);
        let hot: Vec<_> = tasks
            .iter()
            .filter(|t| matches!(t, Task::CoolRoom { .. }))
            .collect();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].device_id(), "thermo-1");
    }

    #[test]
    fn fixed_cutoff_overrides_delta() {
        let rules = TaskRules {
            comfort_delta_c: 1.5,
            hot_cutoff_c: Some(24.5),
        };
        let tasks = derive_tasks(&snapshot(), &rules);
        let hot: Vec<_> = tasks
            .iter()
            .filter(|t| matches!(t, Task::CoolRoom { .. }))
            .collect();
        // Both thermostats read above 24.5 ambient.
        assert_eq!(hot.len(), 2);
    }

    #[test]
    fn suggested_setpoint_clamps_to_comfort_band() {
        // One degree below ambient when inside the band.
        assert!((suggested_setpoint(23.0) - 22.0).abs() < 1e-9);
        // Hot rooms suggest at most the ceiling.
        assert!((suggested_setpoint(27.3) - 25.0).abs() < 1e-9);
        // Cool rooms never suggest below the floor.
        assert!((suggested_setpoint(18.4) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn cool_room_task_carries_fan_and_suggestion() {
        let rules = TaskRules {
            comfort_delta_c: 1.5,
            hot_cutoff_c: Some(26.0),
        };
        let tasks = derive_tasks(&snapshot(), &rules);
        match tasks
            .iter()
            .find(|t| matches!(t, Task::CoolRoom { .. }))
            .unwrap()
        {
            Task::CoolRoom {
                ambient_c,
                suggested_setpoint_c,
                current_fan,
                ..
            } => {
                assert!((ambient_c - 27.3).abs() < 1e-9);
                assert!((suggested_setpoint_c - 25.0).abs() < 1e-9);
                assert_eq!(*current_fan, FanSpeed::High);
            }
            _ => unreachable!(),
        }
    }
}
