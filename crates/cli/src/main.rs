//! Cartwright CLI - Database migrations and cart management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! cartwright migrate
//!
//! # Inspect the cart stored for a cart token
//! cartwright cart show <token>
//!
//! # Delete the cart stored for a cart token
//! cartwright cart clear <token>
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `cart show` / `cart clear` - Inspect or delete stored carts

#![cfg_attr(not(test), forbid(unsafe_code))]

use cartwright_core::CurrencyCode;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cartwright")]
#[command(author, version, about = "Cartwright CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect stored carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart stored for a cart token
    Show {
        /// Cart token (from the shopper's session)
        token: String,

        /// Currency used to format prices
        #[arg(short, long, env = "STOREFRONT_CURRENCY", default_value = "USD")]
        currency: CurrencyCode,
    },
    /// Delete the cart stored for a cart token
    Clear {
        /// Cart token (from the shopper's session)
        token: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Cart { action } => match action {
            CartAction::Show { token, currency } => commands::cart::show(&token, currency).await?,
            CartAction::Clear { token } => commands::cart::clear(&token).await?,
        },
    }
    Ok(())
}
