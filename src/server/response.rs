// API envelope + error → HTTP status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn err(code: &str, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(code.to_string()),
            message: Some(message),
        }
    }
}

/// 200 with the payload wrapped in the envelope
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(data))).into_response()
}

impl WalletError {
    pub fn status(&self) -> StatusCode {
        match self {
            WalletError::NotFound => StatusCode::NOT_FOUND,
            WalletError::AlreadyExists => StatusCode::CONFLICT,
            WalletError::OutOfLimit { .. }
            | WalletError::IntegrityFailure
            | WalletError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WalletError::Unauthorized | WalletError::InvalidPassword | WalletError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            WalletError::Database(_) | WalletError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        // Infrastructure details stay in the log, never in the body
        let message = if self.is_internal() {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (self.status(), Json(ApiResponse::err(self.code(), message))).into_response()
    }
}
