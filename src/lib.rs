// Wallet Service - Core Library
// Exposes the store, processor and integrity guard to the CLI, the API server and tests

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod entities;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod processor;
pub mod wallet;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use config::{AppConfig, AuthScheme, LogFormat};
pub use context::RequestContext;
pub use db::Store;
pub use entities::{
    Account, LimitTiers, MonthlyReport, RegInfo, Token, TokenInfo, Transaction, TransactionRequest,
};
pub use error::{Result, WalletError};
pub use integrity::{IntegrityGuard, DIGEST_HEADER};
pub use processor::TransactionProcessor;
pub use wallet::WalletService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
