//! Application configuration
//!
//! Loaded from a TOML file; every section and field is optional and
//! falls back to a working local default.
//!
//! ```toml
//! [server]
//! api_port = 8080
//!
//! [security]
//! auth_enabled = true
//! jwt_secret = "change-me"
//!
//! [ai]
//! api_key = "sk-..."
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::completion::CompletionConfig;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::{DatabaseConfig, TelemetryConfig};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "OPMETRICS_CONFIG";

const DEFAULT_JWT_SECRET: &str = "opmetrics-dev-secret-change-me";
const DEFAULT_DOCS_USERNAME: &str = "admin";
const DEFAULT_DOCS_PASSWORD: &str = "admin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// `$OPMETRICS_CONFIG`, else `~/.config/opmetrics/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("opmetrics")
        .join("config.toml")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds allowed for cleanup after the shutdown signal
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let db = DatabaseConfig::default();
        Self {
            url: db.url,
            max_connections: db.max_connections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// When false every user-scoped request is admitted unchecked
    pub auth_enabled: bool,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub bcrypt_cost: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            auth_enabled: true,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Mount `/docs`, `/api-doc/openapi.json` and `/demo`
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            username: DEFAULT_DOCS_USERNAME.to_string(),
            password: DEFAULT_DOCS_PASSWORD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub service_name: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        let t = TelemetryConfig::default();
        Self {
            enabled: t.enabled,
            endpoint: t.endpoint,
            timeout_secs: t.timeout.as_secs(),
            service_name: t.service_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Empty disables query suggestions
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            max_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub security: SecurityConfig,
    pub docs: DocsConfig,
    pub telemetry: TelemetrySettings,
    pub ai: AiConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        contents.parse()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.security.auth_enabled && self.security.jwt_secret.is_empty() {
            return Err(ConfigError::invalid(
                "security.jwt_secret",
                "must be set when auth is enabled",
            ));
        }
        if self.security.jwt_expiration_hours <= 0 {
            return Err(ConfigError::invalid(
                "security.jwt_expiration_hours",
                "must be positive",
            ));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::invalid(
                "security.bcrypt_cost",
                "must be between 4 and 31",
            ));
        }
        if self.docs.enabled && (self.docs.username.is_empty() || self.docs.password.is_empty()) {
            return Err(ConfigError::invalid(
                "docs",
                "username and password are required when docs are enabled",
            ));
        }
        if self.telemetry.enabled && self.telemetry.endpoint.is_empty() {
            return Err(ConfigError::invalid(
                "telemetry.endpoint",
                "must be set when telemetry is enabled",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "must be at least 1",
            ));
        }
        match self.logging.format.to_lowercase().as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::invalid(
                "logging.format",
                format!("expected 'text' or 'json', got '{}'", other),
            )),
        }
    }

    /// Built-in credentials still active in this config.
    pub fn default_credentials_in_use(&self) -> Vec<&'static str> {
        let mut in_use = Vec::new();
        if self.security.auth_enabled && self.security.jwt_secret == DEFAULT_JWT_SECRET {
            in_use.push("security.jwt_secret");
        }
        if self.docs.enabled
            && self.docs.username == DEFAULT_DOCS_USERNAME
            && self.docs.password == DEFAULT_DOCS_PASSWORD
        {
            in_use.push("docs.username/docs.password");
        }
        in_use
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.server.api_host, self.server.api_port)
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
        }
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(
            self.security.jwt_secret.clone(),
            self.security.jwt_expiration_hours,
        )
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            enabled: self.telemetry.enabled,
            endpoint: self.telemetry.endpoint.clone(),
            timeout: Duration::from_secs(self.telemetry.timeout_secs),
            service_name: self.telemetry.service_name.clone(),
        }
    }

    /// `None` when no API key is configured.
    pub fn completion_config(&self) -> Option<CompletionConfig> {
        if self.ai.api_key.is_empty() {
            return None;
        }
        Some(CompletionConfig {
            api_key: self.ai.api_key.clone(),
            base_url: self.ai.base_url.clone(),
            model: self.ai.model.clone(),
            max_tokens: self.ai.max_tokens,
            timeout: Duration::from_secs(self.ai.timeout_secs),
        })
    }
}

impl FromStr for AppConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
