use clap::{CommandFactory, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "verdant-cli", version, about = "Verdant CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Device inspection
    Devices {
        #[command(subcommand)]
        action: commands::devices::DevicesAction,
    },
    /// Energy-saving tasks
    Tasks {
        #[command(subcommand)]
        action: commands::tasks::TasksAction,
    },
    /// Garden progress
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Provider credential management
    Provider {
        #[command(subcommand)]
        action: commands::provider::ProviderAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Devices { action } => commands::devices::run(action),
        Commands::Tasks { action } => commands::tasks::run(action),
        Commands::Progress { action } => commands::progress::run(action),
        Commands::Provider { action } => commands::provider::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "verdant-cli",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
