use clap::Subcommand;

use verdant_core::{Accounts, ProgressEngine};

use super::{current_user, open_db};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Show the current level, counters, and garden
    Show,
    /// Reset progress to a fresh garden at level 1
    Reset,
}

pub fn run(action: ProgressAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_db()?;
    let accounts = Accounts::new(db.clone());
    let user = current_user(&accounts)?;
    let engine = ProgressEngine::new(db);

    match action {
        ProgressAction::Show => {
            let view = engine.view(user)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        ProgressAction::Reset => {
            engine.reset(user)?;
            println!("progress reset");
        }
    }
    Ok(())
}
