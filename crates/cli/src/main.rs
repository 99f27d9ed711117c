//! Brunch CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! brunch-cli migrate
//!
//! # Clear the roster now
//! brunch-cli reset
//!
//! # Hash an admin password for the credential file
//! brunch-cli hash-password
//!
//! # Show the next brunch date
//! brunch-cli next-date --today 2024-06-01
//! ```
//!
//! All commands read the same `BRUNCH_*` environment variables as the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "brunch-cli")]
#[command(author, version, about = "Brunch signup manager CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Remove every signup of the current cycle
    Reset,
    /// Print an Argon2 hash for the credential file
    HashPassword {
        /// Password to hash; read from stdin if omitted
        password: Option<String>,
    },
    /// Print the resolved next brunch date
    NextDate {
        /// Evaluate as of this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Reset => {
            commands::roster::reset().await?;
        }
        Commands::HashPassword { password } => commands::password::hash(password)?,
        Commands::NextDate { today } => commands::schedule::next_date(today).await?,
    }
    Ok(())
}
