//! Digistore CLI - session store migrations and admin credential tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table used by the storefront
//! digistore-cli migrate sessions
//!
//! # Hash an admin password for ADMIN_PASSWORD_HASH (reads stdin if omitted)
//! digistore-cli admin hash-password
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "digistore-cli")]
#[command(author, version, about = "Digistore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage admin console credentials
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Create or update the session store table
    Sessions,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Print an Argon2 hash suitable for `ADMIN_PASSWORD_HASH`
    HashPassword {
        /// Password to hash; read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Sessions => commands::migrate::sessions().await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::HashPassword { password } => {
                commands::admin::hash_password(password)?;
            }
        },
    }
    Ok(())
}
