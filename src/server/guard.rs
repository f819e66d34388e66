// Integrity middleware - verifies every inbound body and signs every reply
//
// The handler receives the very bytes that were verified: the body is
// buffered once, checked, and re-injected unchanged.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::WalletError;
use crate::integrity::{IntegrityGuard, DIGEST_HEADER};

pub async fn integrity_layer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let rejected = WalletError::BadRequest(format!("unreadable request body: {}", e));
            return sign_response(&state.guard, rejected.into_response()).await;
        }
    };

    let digest = parts.headers.get(DIGEST_HEADER).and_then(|v| v.to_str().ok());
    if !state.guard.verify(digest, &bytes) {
        tracing::warn!(method = %parts.method, path = %parts.uri.path(), "integrity check failed");
        return sign_response(&state.guard, WalletError::IntegrityFailure.into_response()).await;
    }

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
    sign_response(&state.guard, response).await
}

/// Buffer the response body and attach its digest
async fn sign_response(guard: &IntegrityGuard, response: Response) -> Response {
    let (mut parts, body) = response.into_parts();

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return WalletError::Internal(format!("response body unreadable: {}", e)).into_response();
        }
    };

    // Digest is "sha256=" + hex, always a valid header value
    if let Ok(value) = HeaderValue::from_str(&guard.sign(&bytes)) {
        parts.headers.insert(DIGEST_HEADER, value);
    }

    Response::from_parts(parts, Body::from(bytes))
}
