// Wallet Service - operator CLI
// Schema setup, the out-of-band identification step and monthly reports

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wallet_service::{AppConfig, RequestContext, Store, WalletService};

#[derive(Debug, Parser)]
#[command(name = "wallet")]
#[command(about = "Wallet service operator tool")]
struct Cli {
    /// Path to the TOML config file (defaults apply when omitted)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database schema
    Init,
    /// Mark an account as identified (raises its limit tier)
    Identify { account: i64 },
    /// Print the current month's transactions of an account as JSON
    Report { account: i64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // No secret key needed here: the CLI never signs requests
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.limits.validate()?;

    wallet_service::logging::init_logger(&config.logging);

    let store = Store::open(&config.database.path, config.database.busy_timeout())
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;

    match cli.command {
        Command::Init => {
            println!("✓ Database initialized at {:?}", store.path());
        }
        Command::Identify { account } => {
            let wallet = WalletService::new(store, config.limits, config.security.token_ttl())?;
            wallet.identify(&RequestContext::background(), account)?;
            println!("✓ Account {} identified", account);
        }
        Command::Report { account } => {
            let wallet = WalletService::new(store, config.limits, config.security.token_ttl())?;
            let ctx = RequestContext::background();
            let report = wallet.monthly_report(&ctx, account, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
