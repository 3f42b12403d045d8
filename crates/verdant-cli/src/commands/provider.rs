//! Provider credential management: link/unlink/status for whichever
//! provider the configuration selects.

use clap::Subcommand;

use verdant_core::providers::{keyring_store, NestProvider};
use verdant_core::storage::config::ProviderKind;
use verdant_core::Config;

const HA_TOKEN_KEY: &str = "home_assistant_token";

#[derive(Subcommand)]
pub enum ProviderAction {
    /// Show the configured provider and its credential state
    Status,
    /// Store credentials / run the OAuth consent flow
    Link {
        /// Long-lived access token (Home Assistant)
        #[arg(long)]
        token: Option<String>,
        /// OAuth client ID (Nest)
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret (Nest)
        #[arg(long)]
        client_secret: Option<String>,
    },
    /// Remove stored credentials
    Unlink,
}

pub fn run(action: ProviderAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    match action {
        ProviderAction::Status => {
            let linked = match config.provider.kind {
                ProviderKind::Mock => true,
                ProviderKind::HomeAssistant => keyring_store::get(HA_TOKEN_KEY)?.is_some(),
                ProviderKind::Nest => NestProvider::is_linked(),
            };
            let kind = config.get("provider.kind").unwrap_or_default();
            println!(
                "{kind}: {}",
                if linked { "linked" } else { "not linked" }
            );
        }
        ProviderAction::Link {
            token,
            client_id,
            client_secret,
        } => match config.provider.kind {
            ProviderKind::Mock => println!("mock provider needs no credentials"),
            ProviderKind::HomeAssistant => {
                let token = token.ok_or("--token required for Home Assistant")?;
                keyring_store::set(HA_TOKEN_KEY, &token)?;
                println!("Home Assistant token stored");
            }
            ProviderKind::Nest => {
                if let (Some(id), Some(secret)) = (client_id, client_secret) {
                    NestProvider::set_credentials(&id, &secret)?;
                }
                let provider = NestProvider::new(&config.provider.nest.project_id)?;
                provider.link()?;
                println!("Nest linked");
            }
        },
        ProviderAction::Unlink => match config.provider.kind {
            ProviderKind::Mock => println!("mock provider needs no credentials"),
            ProviderKind::HomeAssistant => {
                keyring_store::delete(HA_TOKEN_KEY)?;
                println!("Home Assistant token removed");
            }
            ProviderKind::Nest => {
                NestProvider::unlink()?;
                println!("Nest unlinked");
            }
        },
    }
    Ok(())
}
