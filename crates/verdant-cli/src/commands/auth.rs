use clap::Subcommand;
use serde_json::json;

use verdant_core::providers::keyring_store;
use verdant_core::Accounts;

use super::{current_user, open_db, SESSION_KEY};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an account and log in
    Signup {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and store the session token
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Invalidate the current session
    Logout,
    /// Show the logged-in account
    Whoami,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    let accounts = Accounts::new(open_db()?);

    match action {
        AuthAction::Signup { username, password } => {
            accounts.signup(&username, &password)?;
            let session = accounts.login(&username, &password)?;
            keyring_store::set(SESSION_KEY, &session.token)?;
            println!("signed up and logged in as {username}");
        }
        AuthAction::Login { username, password } => {
            let session = accounts.login(&username, &password)?;
            keyring_store::set(SESSION_KEY, &session.token)?;
            println!("logged in as {username}");
        }
        AuthAction::Logout => {
            if let Some(token) = keyring_store::get(SESSION_KEY)? {
                accounts.logout(&token)?;
            }
            keyring_store::delete(SESSION_KEY)?;
            println!("logged out");
        }
        AuthAction::Whoami => {
            let me = match current_user(&accounts) {
                Ok(user) => json!({
                    "authenticated": true,
                    "username": accounts.username(user)?.unwrap_or_default(),
                }),
                Err(_) => json!({ "authenticated": false, "username": "" }),
            };
            println!("{}", serde_json::to_string_pretty(&me)?);
        }
    }
    Ok(())
}
