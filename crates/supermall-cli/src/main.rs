//! SuperMall CLI - browse the marketplace and manage your session from the
//! terminal.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use supermall_core::models::Role;

#[derive(Debug, Parser)]
#[command(
    name = "supermall",
    version,
    about = "Browse SuperMall shops, products and offers",
    long_about = None
)]
pub struct Cli {
    /// Backend base URL (overrides config and SUPERMALL_API_BASE_URL).
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Also write logs to this file.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Featured shops and current offers
    Home,

    /// List shops
    Shops {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        category: Option<String>,
        /// popular, rating, name or newest
        #[arg(long, default_value = "popular")]
        sort: String,
    },

    /// Show one shop with its reviews
    Shop { id: i64 },

    /// List products
    Products {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        shop_id: Option<i64>,
        #[arg(long, default_value_t = supermall_core::catalog::DEFAULT_MIN_PRICE)]
        min_price: f64,
        #[arg(long, default_value_t = supermall_core::catalog::DEFAULT_MAX_PRICE)]
        max_price: f64,
        /// popular, price-low, price-high, rating or newest
        #[arg(long, default_value = "popular")]
        sort: String,
    },

    /// List current offers
    Offers,

    /// List reviews for a shop
    Reviews { shop_id: i64 },

    /// Post a review (requires login)
    Review {
        shop_id: i64,
        /// 1 to 5
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
        comment: Option<String>,
    },

    /// Search shops and products
    Search {
        query: String,
        #[arg(long)]
        category: Option<String>,
    },

    /// Create an account
    Register {
        name: String,
        email: String,
        #[arg(long, default_value = "customer")]
        role: Role,
    },

    /// Sign in
    Login { email: String },

    /// Sign out and forget the stored token
    Logout,

    /// Show the signed-in account
    Whoami,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "supermall.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_ref());
    debug!(command = ?cli.command, "SuperMall CLI starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut ctx = commands::Context::new(cli.api_url)?;
    info!(base_url = ctx.api().base_url(), "Using backend");

    let result = commands::dispatch(&mut ctx, cli.command).await;
    ctx.shutdown().await;
    result
}
