//! Task listing and task actions.
//!
//! Actions go to the provider first; only a provider success records a
//! completion with the progress engine.

use clap::Subcommand;

use verdant_core::tasks::suggested_setpoint;
use verdant_core::{derive_tasks, providers, Accounts, Config, FanSpeed, ProgressEngine};

use super::{current_user, open_db};

#[derive(Subcommand)]
pub enum TasksAction {
    /// List derived energy-saving tasks
    List,
    /// Turn a light off and record the completion
    Off {
        /// Light device id
        id: String,
    },
    /// Cool a hot room and record the completion
    Cool {
        /// Thermostat device id
        id: String,
        /// Target setpoint in Celsius (defaults to the suggestion)
        #[arg(long)]
        setpoint: Option<f64>,
        /// Fan speed: low, medium, high, auto
        #[arg(long)]
        fan: Option<FanSpeed>,
    },
}

pub fn run(action: TasksAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let provider = providers::from_config(&config)?;

    match action {
        TasksAction::List => {
            let snapshot = provider.list_devices()?;
            let tasks = derive_tasks(&snapshot, &config.tasks);
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TasksAction::Off { id } => {
            provider.turn_off_light(&id)?;
            record_completion()?;
        }
        TasksAction::Cool { id, setpoint, fan } => {
            let setpoint = match setpoint {
                Some(c) => c,
                None => {
                    let snapshot = provider.list_devices()?;
                    let thermostat = snapshot
                        .thermostats
                        .iter()
                        .find(|t| t.id == id)
                        .ok_or_else(|| format!("thermostat '{id}' not found"))?;
                    suggested_setpoint(thermostat.ambient_c)
                }
            };
            provider.adjust_thermostat(&id, Some(setpoint), fan)?;
            record_completion()?;
        }
    }
    Ok(())
}

fn record_completion() -> Result<(), Box<dyn std::error::Error>> {
    let db = open_db()?;
    let accounts = Accounts::new(db.clone());
    let user = current_user(&accounts)?;

    let engine = ProgressEngine::new(db);
    let outcome = engine.record_completion(user)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
