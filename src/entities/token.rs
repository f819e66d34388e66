// 🔑 Token Entity - bearer token bound to one account until it expires

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
    pub acc_id: i64,
    pub expires: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

impl Token {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// Login request (login = phone)
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenInfo {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenInfo")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}
