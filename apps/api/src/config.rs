//! API configuration module.
//!
//! Configuration is layered:
//!
//! ```text
//! defaults ──► cafe.toml (or $CAFE_CONFIG) ──► CAFE_* environment ──► validate
//! ```
//!
//! Every key is optional in the file; anything missing keeps its default.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use cafe_db::DbConfig;
use serde::{Deserialize, Serialize};

/// Config file read when `CAFE_CONFIG` is unset, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "cafe.toml";

/// Signing secret used when none is configured. Rejected in production.
pub const DEV_JWT_SECRET: &str = "cafe-dev-secret-change-in-production";

/// Shortest secret accepted in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(()),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Cafe API configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite file path, or `:memory:`
    pub database_path: String,

    /// Pool size for file databases
    pub max_connections: u32,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    pub environment: Environment,

    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub log_level: String,

    pub log_format: LogFormat,

    /// Allowed CORS origins. Empty allows any origin in development.
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: "./data/cafe.db".to_string(),
            max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 86_400, // 24 hours
            environment: Environment::Development,
            log_level: "info,cafe_api=debug,cafe_db=debug".to_string(),
            log_format: LogFormat::Pretty,
            cors_origins: Vec::new(),
        }
    }
}

// The secret stays out of logs.
impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("max_connections", &self.max_connections)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_lifetime_secs", &self.jwt_lifetime_secs)
            .field("environment", &self.environment)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("CAFE_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parses TOML text. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `CAFE_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CAFE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("CAFE_PORT") {
            self.port = parse_var("CAFE_PORT", &port)?;
        }
        if let Some(path) = lookup("CAFE_DATABASE_PATH") {
            self.database_path = path;
        }
        if let Some(max) = lookup("CAFE_DB_MAX_CONNECTIONS") {
            self.max_connections = parse_var("CAFE_DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(secret) = lookup("CAFE_JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(lifetime) = lookup("CAFE_JWT_LIFETIME_SECS") {
            self.jwt_lifetime_secs = parse_var("CAFE_JWT_LIFETIME_SECS", &lifetime)?;
        }
        if let Some(environment) = lookup("CAFE_ENV") {
            self.environment = parse_var("CAFE_ENV", &environment)?;
        }
        if let Some(level) = lookup("CAFE_LOG") {
            self.log_level = level;
        }
        if let Some(format) = lookup("CAFE_LOG_FORMAT") {
            self.log_format = parse_var("CAFE_LOG_FORMAT", &format)?;
        }
        if let Some(origins) = lookup("CAFE_CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        Ok(())
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("port".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_lifetime_secs".to_string()));
        }
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }

        if self.environment == Environment::Production
            && (self.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN
                || self.jwt_secret == DEV_JWT_SECRET)
        {
            return Err(ConfigError::InsecureSecret);
        }

        Ok(())
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Database settings for [`cafe_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        let config = DbConfig::new(&self.database_path);
        if config.is_in_memory() {
            config
        } else {
            config.max_connections(self.max_connections)
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("JWT secret must be at least 32 bytes and not the development default in production")]
    InsecureSecret,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_toml_keeps_missing_defaults() {
        let config = ApiConfig::from_toml(
            r#"
            port = 9000
            environment = "production"
            cors_origins = ["https://cafe.example"]
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.cors_origins, vec!["https://cafe.example"]);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ApiConfig::from_toml("port = 9000").unwrap();
        config
            .apply_overrides(lookup(&[
                ("CAFE_PORT", "7070"),
                ("CAFE_LOG_FORMAT", "json"),
                ("CAFE_CORS_ORIGINS", "https://a.example, https://b.example,"),
            ]))
            .unwrap();

        assert_eq!(config.port, 7070);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = ApiConfig::default();
        let err = config
            .apply_overrides(lookup(&[("CAFE_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "CAFE_PORT"));
    }

    #[test]
    fn test_production_requires_strong_secret() {
        let mut config = ApiConfig {
            environment: Environment::Production,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InsecureSecret)));

        config.jwt_secret = "short".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InsecureSecret)));

        config.jwt_secret = "a".repeat(MIN_PRODUCTION_SECRET_LEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ApiConfig::default();
        let printed = format!("{:?}", config);
        assert!(!printed.contains(DEV_JWT_SECRET));
    }
}
