// ⚠️ Wallet Errors - one taxonomy for store, processor, guard and HTTP layer

use thiserror::Error;

/// Every failure the wallet core can report.
///
/// Business outcomes (`NotFound`, `OutOfLimit`, `IntegrityFailure`, ...) are
/// expected and carry no partial mutation. `Database` and `Internal` form the
/// internal class: infrastructure broke and the caller should log it.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("account not found")]
    NotFound,

    #[error("account already exists")]
    AlreadyExists,

    /// Applying `amount` would move `balance` outside `[0, limit]`
    #[error("out of limit: balance {balance} + amount {amount} outside [0, {limit}]")]
    OutOfLimit { balance: i64, amount: i64, limit: i64 },

    #[error("request integrity check failed")]
    IntegrityFailure,

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid password")]
    InvalidPassword,

    #[error("token expired")]
    TokenExpired,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Store/infrastructure failures, as opposed to business outcomes
    pub fn is_internal(&self) -> bool {
        matches!(self, WalletError::Database(_) | WalletError::Internal(_))
    }

    /// Stable machine-readable code surfaced in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::NotFound => "not_found",
            WalletError::AlreadyExists => "already_exists",
            WalletError::OutOfLimit { .. } => "out_of_limit",
            WalletError::IntegrityFailure => "integrity_failure",
            WalletError::Unauthorized => "unauthorized",
            WalletError::InvalidPassword => "invalid_password",
            WalletError::TokenExpired => "token_expired",
            WalletError::BadRequest(_) => "bad_request",
            WalletError::Database(_) | WalletError::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
