//! EZ Apps CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ez-cli migrate
//!
//! # Create a superadmin profile
//! ez-cli admin create -e ops@ezapps.io -n "Ops Team"
//!
//! # Print a one-time sign-in link for any profile
//! ez-cli admin magic-link -e merchant@example.com
//!
//! # Sync one store, or every connected store
//! ez-cli sync --store-id 42
//! ez-cli sync --all
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create superadmin profiles
//! - `admin magic-link` - Issue a magic link without rate limiting
//! - `sync` - Pull orders and products from Shopify

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ez-cli")]
#[command(author, version, about = "EZ Apps CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage superadmins and support logins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Sync orders and products from Shopify
    Sync(SyncTarget),
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new superadmin profile
    Create {
        /// Superadmin email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// Issue a magic link for an existing profile and print it
    MagicLink {
        /// Email of the profile to sign in as
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SyncTarget {
    /// Sync a single store by ID
    #[arg(long)]
    store_id: Option<i32>,

    /// Sync every connected store
    #[arg(long)]
    all: bool,
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
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name } => {
                commands::admin::create_superadmin(&email, &name).await?;
            }
            AdminAction::MagicLink { email } => {
                commands::admin::magic_link(&email).await?;
            }
        },
        Commands::Sync(target) => match (target.store_id, target.all) {
            (Some(id), _) => commands::sync::store(id).await?,
            (None, true) => commands::sync::all().await?,
            (None, false) => return Err("pass --store-id or --all".into()),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["ez-cli", "sync"]).is_err());
        assert!(Cli::try_parse_from(["ez-cli", "sync", "--all", "--store-id", "1"]).is_err());
        assert!(Cli::try_parse_from(["ez-cli", "sync", "--store-id", "1"]).is_ok());
    }

    #[test]
    fn test_admin_create_parses_short_flags() {
        let cli = Cli::try_parse_from(["ez-cli", "admin", "create", "-e", "a@b.co", "-n", "Ops"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Admin {
                action: AdminAction::Create { .. }
            })
        ));
    }
}
