pub mod auth;
pub mod config;
pub mod devices;
pub mod progress;
pub mod provider;
pub mod tasks;

use std::sync::Arc;

use verdant_core::providers::keyring_store;
use verdant_core::{Accounts, Database, UserId};

/// Keyring key for the CLI's current session token.
pub const SESSION_KEY: &str = "session_token";

/// Resolve the logged-in user from the stored session token.
pub fn current_user(accounts: &Accounts) -> Result<UserId, Box<dyn std::error::Error>> {
    let token = keyring_store::get(SESSION_KEY)?
        .ok_or("not logged in; run `verdant-cli auth login` first")?;
    Ok(accounts.authenticate(&token)?)
}

/// Open the shared database once for a command.
pub fn open_db() -> Result<Arc<Database>, Box<dyn std::error::Error>> {
    Ok(Arc::new(Database::open()?))
}
