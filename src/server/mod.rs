// Wallet HTTP Server - REST API with Axum
//
// Every /api/wallet route sits behind the integrity middleware; the health
// check does not.

pub mod extract;
pub mod guard;
pub mod handlers;
pub mod response;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, AuthScheme};
use crate::context::RequestContext;
use crate::db::Store;
use crate::error::WalletError;
use crate::integrity::IntegrityGuard;
use crate::wallet::WalletService;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub wallet: WalletService,
    pub guard: IntegrityGuard,
    pub auth_scheme: AuthScheme,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    /// Open the store and wire every component from `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Store::open(&config.database.path, config.database.busy_timeout())
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        let wallet = WalletService::new(store, config.limits, config.security.token_ttl())?;
        let guard = IntegrityGuard::new(config.security.secret_key.as_bytes())?;

        Ok(AppState {
            wallet,
            guard,
            auth_scheme: config.security.auth_scheme,
            request_timeout: config.server.request_timeout(),
            max_body_bytes: config.server.max_body_bytes,
        })
    }
}

/// Run blocking store work on the worker pool.
///
/// If the awaiting future is dropped (client gone, server shutting down) the
/// context is cancelled, so a transaction still in flight rolls back.
pub async fn run_blocking<T, F>(ctx: &RequestContext, work: F) -> Result<T, WalletError>
where
    F: FnOnce() -> Result<T, WalletError> + Send + 'static,
    T: Send + 'static,
{
    let _cancel = ctx.cancel_on_drop();

    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| WalletError::Internal(format!("worker task failed: {}", e)))?
}

pub fn router(state: AppState) -> Router {
    let wallet_routes = Router::new()
        .route("/exist/:phone", get(handlers::handle_exist))
        .route("/register", post(handlers::handle_register))
        .route("/token", post(handlers::handle_token))
        .route("/transaction", post(handlers::handle_transaction))
        .route("/transactions", get(handlers::handle_transactions_per_month))
        .route("/account", get(handlers::handle_account))
        .route("/balance", get(handlers::handle_balance))
        .route("/identify", post(handlers::handle_identify))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::integrity_layer))
        .with_state(state);

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .nest("/api/wallet", wallet_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(state: AppState, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    tracing::info!(addr = %bind_addr, "wallet server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("wallet server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
