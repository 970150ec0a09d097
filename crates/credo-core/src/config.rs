//! Credo Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Signing secret used when nothing else is configured. Development only.
pub const DEV_JWT_SECRET: &str = "credo-dev-secret-change-me";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Credential store connection
    pub database: DatabaseConfig,

    /// Token signing configuration
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_vars(env_var)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    ///
    /// Every variable that is set wins over the file, even when its value
    /// equals the built-in default.
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.apply_vars(env_var)
    }

    /// Overwrite each field whose variable `var` returns
    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Server
        if let Some(host) = var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("API_PORT") {
            self.server.port = parse_var("API_PORT", port)?;
        }
        if let Some(origins) = var("CORS_ORIGINS") {
            self.server.cors_origins = split_origins(&origins);
        }

        // PostgreSQL
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(max) = var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", max)?;
        }

        // Tokens
        if let Some(secret) = var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = var("JWT_EXPIRES_IN") {
            self.auth.token_ttl_secs = parse_var("JWT_EXPIRES_IN", ttl)?;
        }
        if let Some(issuer) = var("JWT_ISSUER") {
            self.auth.issuer = issuer;
        }

        // Logging
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.json_format = parse_log_format(&format)?;
        }

        Ok(self)
    }

    /// Check values that would make the service unsafe or unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_EXPIRES_IN".to_string(),
                value: "0".to_string(),
            });
        }
        if self.auth.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("Using the development JWT secret; set JWT_SECRET in production");
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn parse_log_format(value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "json" => Ok(true),
        "text" | "pretty" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: "LOG_FORMAT".to_string(),
            value: value.to_string(),
        }),
    }
}

fn split_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            // Empty means permissive CORS; set CORS_ORIGINS to restrict
            cors_origins: vec![],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub url: Option<String>,

    /// Upper bound on pooled connections
    pub max_connections: u32,

    /// Connections kept open while idle
    pub min_connections: u32,

    /// Seconds to wait for a free connection
    pub acquire_timeout_secs: u64,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
            run_migrations: true,
        }
    }
}

/// Token issuance configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub token_ttl_secs: u64,

    /// `iss` claim written into and required from every token
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_secs: 86_400,
            issuer: "credo".to_string(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.auth.token_ttl_secs, 86_400);
        assert_eq!(config.auth.issuer, "credo");
        assert!(config.database.url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9000

            [auth]
            jwt_secret = "from-file"
            token_ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.token_ttl_secs, 60);
        assert_eq!(config.auth.issuer, "credo");
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::from_toml_str("[server\nport = ").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file("/nonexistent/credo.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = AppConfig::default();
        config.auth.token_ttl_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let mut config = AuthConfig::default();
        config.jwt_secret = "super-secret-value".to_string();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("redacted"));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_vars_override_file_values() {
        let file = AppConfig::from_toml_str(
            r#"
            [database]
            max_connections = 3

            [auth]
            token_ttl_secs = 60
            issuer = "file-issuer"

            [logging]
            json_format = false
            "#,
        )
        .unwrap();

        let config = file
            .apply_vars(vars(&[
                ("DATABASE_MAX_CONNECTIONS", "25"),
                ("JWT_EXPIRES_IN", "86400"),
                ("JWT_ISSUER", "env-issuer"),
                ("LOG_FORMAT", "json"),
            ]))
            .unwrap();

        assert_eq!(config.database.max_connections, 25);
        // Set explicitly, so it wins even though it equals the default
        assert_eq!(config.auth.token_ttl_secs, 86_400);
        assert_eq!(config.auth.issuer, "env-issuer");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_unset_vars_keep_file_values() {
        let mut file = AppConfig::default();
        file.server.port = 9000;
        file.auth.issuer = "file-issuer".to_string();

        let config = file.apply_vars(vars(&[("API_HOST", "127.0.0.1")])).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.issuer, "file-issuer");
    }

    #[test]
    fn test_invalid_var_is_reported() {
        let err = AppConfig::default()
            .apply_vars(vars(&[("JWT_EXPIRES_IN", "a day")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "JWT_EXPIRES_IN"));
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_log_format("JSON").unwrap());
        assert!(!parse_log_format("text").unwrap());
        assert!(parse_log_format("xml").is_err());

        assert_eq!(parse_var::<u16>("API_PORT", "8081".to_string()).unwrap(), 8081);
        assert!(parse_var::<u16>("API_PORT", "port".to_string()).is_err());

        assert_eq!(
            split_origins(" http://a.test, ,http://b.test "),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
