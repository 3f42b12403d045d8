use clap::Subcommand;

use verdant_core::{providers, Config};

#[derive(Subcommand)]
pub enum DevicesAction {
    /// List devices from the configured provider
    List,
}

pub fn run(action: DevicesAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let provider = providers::from_config(&config)?;

    match action {
        DevicesAction::List => {
            let snapshot = provider.list_devices()?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }
    Ok(())
}
