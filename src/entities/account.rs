// 💳 Account Entity - balance holder with an identification tier
//
// Balance is in the smallest currency unit and only ever moves through the
// transaction processor. The identified flag selects which limit tier caps
// the balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

/// Account as exposed to callers (no password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Assigned by the store on registration
    pub id: i64,

    /// Current balance, smallest currency unit
    pub balance: i64,

    /// Raised once by the identification step
    pub identified: bool,

    pub username: String,
    pub phone: String,
    pub active: bool,
    pub created: DateTime<Utc>,
}

impl Account {
    /// Upper balance bound for this account under `tiers`
    pub fn limit(&self, tiers: &LimitTiers) -> i64 {
        tiers.limit_for(self.identified)
    }
}

// ============================================================================
// LIMIT TIERS
// ============================================================================

/// Maximum permissible balance by identification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitTiers {
    #[serde(default = "default_unidentified")]
    pub unidentified: i64,

    #[serde(default = "default_identified")]
    pub identified: i64,
}

fn default_unidentified() -> i64 {
    1_000_000
}

fn default_identified() -> i64 {
    10_000_000
}

impl Default for LimitTiers {
    fn default() -> Self {
        LimitTiers {
            unidentified: default_unidentified(),
            identified: default_identified(),
        }
    }
}

impl LimitTiers {
    pub fn limit_for(&self, identified: bool) -> i64 {
        if identified {
            self.identified
        } else {
            self.unidentified
        }
    }

    /// Tiers must be non-negative and identification must never lower the cap
    pub fn validate(&self) -> Result<()> {
        if self.unidentified < 0 || self.identified < self.unidentified {
            return Err(WalletError::BadRequest(format!(
                "invalid limit tiers: unidentified={} identified={}",
                self.unidentified, self.identified
            )));
        }
        Ok(())
    }
}

// ============================================================================
// REGISTRATION REQUEST
// ============================================================================

/// Fields required to register a new account
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegInfo {
    pub username: String,
    pub phone: String,
    pub password: String,
}

impl RegInfo {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(WalletError::BadRequest("username is required".into()));
        }
        if self.phone.trim().is_empty() {
            return Err(WalletError::BadRequest("phone is required".into()));
        }
        if self.password.is_empty() {
            return Err(WalletError::BadRequest("password is required".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RegInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegInfo")
            .field("username", &self.username)
            .field("phone", &self.phone)
            .field("password", &"***")
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_tiers() {
        let tiers = LimitTiers::default();

        assert_eq!(tiers.limit_for(false), 1_000_000);
        assert_eq!(tiers.limit_for(true), 10_000_000);
        assert!(tiers.validate().is_ok());
    }

    #[test]
    fn test_limit_tiers_rejects_inverted_caps() {
        let tiers = LimitTiers { unidentified: 500, identified: 100 };
        assert!(tiers.validate().is_err());

        let tiers = LimitTiers { unidentified: -1, identified: 100 };
        assert!(tiers.validate().is_err());
    }

    #[test]
    fn test_reg_info_rejects_unknown_fields() {
        let json = r#"{"username":"a","phone":"1","password":"p","balance":100}"#;
        assert!(serde_json::from_str::<RegInfo>(json).is_err());
    }

    #[test]
    fn test_reg_info_debug_hides_password() {
        let info = RegInfo {
            username: "alice".into(),
            phone: "+992900000001".into(),
            password: "hunter2".into(),
        };

        assert!(!format!("{:?}", info).contains("hunter2"));
        assert!(info.validate().is_ok());
    }
}
