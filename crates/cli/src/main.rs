//! Mystery Box CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! mb products list --category phones --tag Apple --sort price-asc
//! mb products list --from-query "q=box&sort=newest&page=2"
//! mb products show mystery-box
//!
//! # Manage the cart
//! mb cart add variant_01 --quantity 2
//! mb cart show
//!
//! # Wishlist and account
//! mb wishlist add mystery-box
//! mb wishlist move variant_01
//! mb account login -e shopper@example.com
//! ```
//!
//! # Commands
//!
//! - `products`, `categories`, `collections` - Browse the catalog
//! - `cart` - View and change the cart
//! - `wishlist` - Saved variants, kept on this machine
//! - `account` - Sign in, register and manage addresses
//!
//! Configuration comes from the environment; see `StorefrontConfig`.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mystery_box_storefront::error::Result;
use mystery_box_storefront::{Storefront, StorefrontConfig};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::account::AccountAction;
use commands::cart::CartAction;
use commands::catalog::{CategoriesAction, CollectionsAction, ProductsAction};
use commands::wishlist::WishlistAction;

#[derive(Parser)]
#[command(name = "mb")]
#[command(author, version, about = "Mystery Box storefront CLI")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and search products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Browse product categories
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
    /// Browse collections
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,
    },
    /// View and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage saved items
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Sign in and manage your account
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mystery_box_storefront=info,mystery_box_cli=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Sentry before tracing so the tracing layer has a client to talk to
    let _sentry_guard = init_sentry(&config);
    init_tracing(cli.json_logs);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: StorefrontConfig) -> Result<()> {
    let storefront = Storefront::new(config)?;

    match command {
        Commands::Products { action } => commands::catalog::products(&storefront, action).await,
        Commands::Categories { action } => {
            commands::catalog::categories(&storefront, action).await
        }
        Commands::Collections { action } => {
            commands::catalog::collections(&storefront, action).await
        }
        Commands::Cart { action } => commands::cart::run(&storefront, action).await,
        Commands::Wishlist { action } => commands::wishlist::run(&storefront, action).await,
        Commands::Account { action } => commands::account::run(&storefront, action).await,
    }
}
