//! Tsitsi Store CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! tsitsi-cli migrate
//!
//! # Create a staff account
//! tsitsi-cli staff create -e owner@example.mg -u owner -p 'long passphrase'
//!
//! # Give an existing account dashboard access
//! tsitsi-cli staff promote -e manager@example.mg
//!
//! # Load demo categories, products and the about page
//! tsitsi-cli seed --file crates/cli/seed/catalog.yaml
//! ```
//!
//! Every command reads `STOREFRONT_DATABASE_URL` (a `.env` file is honoured).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tsitsi-cli")]
#[command(author, version, about = "Tsitsi Store CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage staff accounts
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long, default_value = "crates/cli/seed/catalog.yaml")]
        file: String,
    },
}

#[derive(Subcommand)]
enum StaffAction {
    /// Create a new staff account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Given name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Family name
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Grant dashboard access to an existing account
    Promote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Staff { action } => match action {
            StaffAction::Create {
                email,
                username,
                password,
                first_name,
                last_name,
            } => {
                commands::staff::create(&email, &username, &password, &first_name, &last_name)
                    .await?;
            }
            StaffAction::Promote { email } => commands::staff::promote(&email).await?,
        },
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
    }
    Ok(())
}
