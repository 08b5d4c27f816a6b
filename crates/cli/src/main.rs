//! Product Catalog CLI - Browse the product listing from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # First page of the remote listing
//! catalog list
//!
//! # Remote search, page 2
//! catalog list --search phone --page 2
//!
//! # Client-side filtering and sorting over the whole catalog
//! catalog list --category smartphones --in-stock --sort price-asc
//!
//! # Offline, from a JSON fixture
//! catalog --fixture products.json list --max-price 20
//!
//! # Category tags
//! catalog categories
//! ```
//!
//! # Commands
//!
//! - `list` - Show one page of the listing for the given filters
//! - `categories` - List category tags

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use product_catalog_listing::{
    CatalogClient, CatalogConfig, CatalogSource, InMemoryCatalog, ProductListing,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::list::ListArgs;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(author, version, about = "Product catalog listing browser")]
struct Cli {
    /// Serve products from a JSON fixture instead of the remote API
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one page of the product listing
    List(ListArgs),
    /// List category tags
    Categories,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "product_catalog_listing=info,product_catalog_cli=info".into());

    // Logs go to stderr so stdout stays pipeable
    let json_layer = cli.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!cli.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CatalogConfig::from_env()?;

    match cli.fixture {
        Some(path) => {
            let source = InMemoryCatalog::from_json_file(&path)
                .map_err(|e| format!("Failed to load fixture {}: {e}", path.display()))?;
            tracing::info!(path = %path.display(), products = source.len(), "Loaded fixture");
            dispatch(cli.command, source, &config, cli.json).await
        }
        None => {
            let source = CatalogClient::new(&config)?;
            dispatch(cli.command, source, &config, cli.json).await
        }
    }
}

async fn dispatch<S: CatalogSource>(
    command: Commands,
    source: S,
    config: &CatalogConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let listing = ProductListing::new(source, config);

    match command {
        Commands::List(args) => commands::list::run(&listing, &args, json).await?,
        Commands::Categories => commands::categories::run(&listing, json).await?,
    }
    Ok(())
}
