// ⚙️ Service Configuration - TOML file with defaults for every field

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::entities::LimitTiers;

/// Environment variable overriding `security.secret_key`
pub const SECRET_KEY_ENV: &str = "WALLET_SECRET_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub limits: LimitTiers,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9999,
            request_timeout_secs: 10,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./wallet.db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// How the caller's account id reaches the request context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>` looked up in the token table
    Token,
    /// `X-UserID: <id>` asserted by a trusted front proxy
    UserIdHeader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub secret_key: String,
    pub token_ttl_secs: u64,
    pub auth_scheme: AuthScheme,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            token_ttl_secs: 3_600,
            auth_scheme: AuthScheme::Token,
        }
    }
}

impl SecurityConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "wallet_service=info,tower_http=info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    /// Load from `path` (defaults when `None`), apply env overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(secret) = std::env::var(SECRET_KEY_ENV) {
            config.security.secret_key = secret;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.secret_key.is_empty() {
            bail!("security.secret_key is empty (set it in the config or via {})", SECRET_KEY_ENV);
        }
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if self.server.max_body_bytes == 0 {
            bail!("server.max_body_bytes must be non-zero");
        }
        self.limits.validate()?;
        Ok(())
    }
}
