// ============================================================================
// API Handlers
// ============================================================================
//
// Each handler parses its tagged body, hands the blocking store work to the
// worker pool with the request context, and wraps the result in the envelope.

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::de::DeserializeOwned;

use super::response::{ok, ApiResponse};
use super::{run_blocking, AppState};
use crate::context::RequestContext;
use crate::entities::{RegInfo, TokenInfo, TransactionRequest};
use crate::error::WalletError;

type HandlerResult = Result<Response, WalletError>;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, WalletError> {
    serde_json::from_slice(body)
        .map_err(|e| WalletError::BadRequest(format!("invalid request body: {}", e)))
}

/// GET /api/health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/wallet/exist/:phone - Account registered under a phone, or null
pub async fn handle_exist(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(phone): Path<String>,
) -> HandlerResult {
    let wallet = state.wallet.clone();
    let worker_ctx = ctx.clone();
    let account = run_blocking(&ctx, move || wallet.exists(&worker_ctx, &phone)).await?;

    Ok(ok(account))
}

/// POST /api/wallet/register - Register a new account
pub async fn handle_register(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> HandlerResult {
    let info: RegInfo = parse_body(&body)?;

    let wallet = state.wallet.clone();
    let worker_ctx = ctx.clone();
    let account = run_blocking(&ctx, move || wallet.register(&worker_ctx, info)).await?;

    Ok(ok(account))
}

/// POST /api/wallet/token - Exchange phone + password for a bearer token
pub async fn handle_token(State(state): State<AppState>, ctx: RequestContext, body: Bytes) -> HandlerResult {
    let info: TokenInfo = parse_body(&body)?;

    let wallet = state.wallet.clone();
    let worker_ctx = ctx.clone();
    let token = run_blocking(&ctx, move || wallet.issue_token(&worker_ctx, info)).await?;

    Ok(ok(token))
}

/// POST /api/wallet/transaction - Credit/debit the caller's own account
pub async fn handle_transaction(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> HandlerResult {
    let request: TransactionRequest = parse_body(&body)?;

    let wallet = state.wallet.clone();
    let worker_ctx = ctx.clone();
    let transaction = run_blocking(&ctx, move || wallet.transaction(&worker_ctx, request)).await?;

    Ok(ok(transaction))
}

/// GET /api/wallet/transactions - Caller's transactions in the current month
pub async fn handle_transactions_per_month(State(state): State<AppState>, ctx: RequestContext) -> HandlerResult {
    let acc_id = ctx.require_caller()?;

    let wallet = state.wallet.clone();
    let worker_ctx = ctx.clone();
    let report =
        run_blocking(&ctx, move || wallet.monthly_report(&worker_ctx, acc_id, Utc::now())).await?;

    Ok(ok(report))
}

/// GET /api/wallet/account - Caller's account
pub async fn handle_account(State(state): State<AppState>, ctx: RequestContext) -> HandlerResult {
    let acc_id = ctx.require_caller()?;

    let wallet = state.wallet.clone();
    let worker_ctx = ctx.clone();
    let account = run_blocking(&ctx, move || wallet.account(&worker_ctx, acc_id)).await?;

    Ok(ok(account))
}

/// GET /api/wallet/balance - Caller's balance
pub async fn handle_balance(State(state): State<AppState>, ctx: RequestContext) -> HandlerResult {
    let acc_id = ctx.require_caller()?;

    let wallet = state.wallet.clone();
    let worker_ctx = ctx.clone();
    let balance = run_blocking(&ctx, move || wallet.balance(&worker_ctx, acc_id)).await?;

    Ok(ok(balance))
}

/// POST /api/wallet/identify - Mark the caller's account as identified
pub async fn handle_identify(State(state): State<AppState>, ctx: RequestContext) -> HandlerResult {
    let acc_id = ctx.require_caller()?;

    let wallet = state.wallet.clone();
    let worker_ctx = ctx.clone();
    run_blocking(&ctx, move || wallet.identify(&worker_ctx, acc_id)).await?;

    Ok(ok("Account was identified"))
}
