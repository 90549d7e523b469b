//! Server configuration module.
//!
//! Sources, later ones winning:
//!
//! ```text
//! built-in defaults ──► keystone.toml (optional) ──► .env ──► KEYSTONE_* env vars
//! ```

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Keystone server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub token_lifetime_secs: i64,

    /// Default list page size
    pub items_per_page: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: "./keystone.db".to_string(),
            max_connections: 5,
            jwt_secret: "keystone-dev-secret-change-in-production".to_string(),
            token_lifetime_secs: 3600,
            items_per_page: keystone_core::DEFAULT_PAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from defaults, `keystone.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = ServerConfig::default();
        let config: ServerConfig = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port)?
            .set_default("database_path", defaults.database_path)?
            .set_default("max_connections", defaults.max_connections)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("token_lifetime_secs", defaults.token_lifetime_secs)?
            .set_default("items_per_page", defaults.items_per_page)?
            .add_source(File::with_name("keystone").required(false))
            .add_source(Environment::with_prefix("KEYSTONE").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue("jwt_secret".to_string()));
        }
        if self.items_per_page <= 0 {
            return Err(ConfigError::InvalidValue("items_per_page".to_string()));
        }
        if self.token_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("token_lifetime_secs".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.items_per_page, 20);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = ServerConfig {
            jwt_secret: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let config = ServerConfig {
            items_per_page: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
