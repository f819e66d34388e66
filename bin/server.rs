// Wallet Service - Web Server
// REST API with Axum over the SQLite store

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use wallet_service::logging::init_logger;
use wallet_service::server::{serve, AppState};
use wallet_service::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "wallet-server")]
#[command(about = "Wallet account service HTTP API")]
struct Args {
    /// Path to the TOML config file (defaults apply when omitted)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    init_logger(&config.logging);
    tracing::info!(
        version = wallet_service::VERSION,
        database = %config.database.path,
        auth_scheme = ?config.security.auth_scheme,
        "starting wallet server"
    );

    let state = AppState::from_config(&config)?;
    serve(state, &config.server.bind_addr()).await
}
