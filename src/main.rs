//! vinted-scraper - Query the Vinted catalog from the command line
//!
//! Prints search results and item details as JSON.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use vinted_scraper::commands::{ItemCommand, SearchCommand, SearchOptions};
use vinted_scraper::config::ClientConfig;
use vinted_scraper::ItemEndpoint;

#[derive(Parser)]
#[command(
    name = "vinted-scraper",
    version,
    about = "Query the Vinted catalog from the command line",
    long_about = "Bootstraps an anonymous Vinted session and prints catalog search results or item details as JSON."
)]
struct Cli {
    /// Vinted domain to query (e.g., https://www.vinted.it)
    #[arg(short, long, global = true, env = "VINTED_BASE_URL")]
    base_url: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "VINTED_PROXY")]
    proxy: Option<String>,

    /// User-Agent to send instead of a random one
    #[arg(long, global = true, env = "VINTED_USER_AGENT")]
    user_agent: Option<String>,

    /// Item endpoint generation (details, plain)
    #[arg(long, global = true)]
    item_endpoint: Option<ItemEndpoint>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog
    #[command(alias = "s")]
    Search {
        /// Search text
        query: String,

        /// Result page
        #[arg(long)]
        page: Option<u32>,

        /// Results per page
        #[arg(long)]
        per_page: Option<u32>,

        /// Sort order (e.g., newest_first, price_low_to_high)
        #[arg(long)]
        order: Option<String>,

        /// Minimum price filter
        #[arg(long)]
        price_from: Option<f64>,

        /// Maximum price filter
        #[arg(long)]
        price_to: Option<f64>,

        /// Print the raw API response
        #[arg(long)]
        raw: bool,
    },

    /// Look up items by id
    #[command(alias = "i")]
    Item {
        /// Item id(s) to look up
        #[arg(required = true)]
        ids: Vec<String>,

        /// Print the raw API response
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = ClientConfig::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(user_agent) = cli.user_agent {
        config.user_agent = Some(user_agent);
    }
    if let Some(item_endpoint) = cli.item_endpoint {
        config.item_endpoint = item_endpoint;
    }

    match cli.command {
        Commands::Search { query, page, per_page, order, price_from, price_to, raw } => {
            let options = SearchOptions { page, per_page, order, price_from, price_to, raw };
            let cmd = SearchCommand::new(config, options);
            let output = cmd.execute(&query).await?;
            println!("{}", output);
        }

        Commands::Item { ids, raw } => {
            let cmd = ItemCommand::new(config, raw);

            let output = if ids.len() == 1 {
                cmd.execute(&ids[0]).await?
            } else {
                cmd.execute_batch(&ids).await?
            };

            println!("{}", output);
        }
    }

    Ok(())
}
