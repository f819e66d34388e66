// RequestContext extractor - resolves the caller identity per auth scheme

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;

use super::{run_blocking, AppState};
use crate::auth::parse_bearer;
use crate::config::AuthScheme;
use crate::context::RequestContext;
use crate::error::WalletError;

/// Header asserting the caller id under `AuthScheme::UserIdHeader`
pub const USER_ID_HEADER: &str = "x-userid";

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = WalletError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let caller = match state.auth_scheme {
            AuthScheme::Token => caller_from_token(parts, state).await?,
            AuthScheme::UserIdHeader => caller_from_header(parts)?,
        };

        Ok(RequestContext::new(caller).with_timeout(state.request_timeout))
    }
}

async fn caller_from_token(parts: &Parts, state: &AppState) -> Result<Option<i64>, WalletError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(parse_bearer)
        .ok_or(WalletError::Unauthorized)?
        .to_string();

    let wallet = state.wallet.clone();
    let ctx = RequestContext::new(None);
    let acc_id = run_blocking(&ctx, move || wallet.authenticate(&token, Utc::now())).await?;

    Ok(Some(acc_id))
}

fn caller_from_header(parts: &Parts) -> Result<Option<i64>, WalletError> {
    let Some(header) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    header
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .map(Some)
        .ok_or_else(|| WalletError::BadRequest("malformed X-UserID header".into()))
}
