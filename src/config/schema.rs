//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pepper used when no `[auth]` section is configured. Rejected in production.
pub const DEV_PEPPER: &str = "dev-pepper-change-me";

/// HMAC key used when no `[auth]` section is configured. Rejected in production.
pub const DEV_HMAC_KEY: &str = "dev-hmac-key-change-me";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration for the HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// "dev" or "prod"
    #[serde(default = "default_env")]
    pub env: String,

    /// Root directory for uploaded gallery images
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Upper bound for a single request, storage calls included
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_env() -> String {
    "dev".to_string()
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("./images")
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            env: default_env(),
            images_dir: default_images_dir(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn is_prod(&self) -> bool {
        self.env == "prod"
    }
}

/// Which storage backend the services run on
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_name")]
    pub name: String,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_name() -> String {
    "photobook_dev".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            name: default_db_name(),
        }
    }
}

impl DatabaseConfig {
    /// Connection string understood by tokio-postgres
    pub fn connection_info(&self) -> String {
        if self.password.is_empty() {
            format!(
                "host={} port={} user={} dbname={} sslmode=disable",
                self.host, self.port, self.user, self.name
            )
        } else {
            format!(
                "host={} port={} user={} password={} dbname={} sslmode=disable",
                self.host, self.port, self.user, self.password, self.name
            )
        }
    }
}

/// Secrets and cost parameters for the identity chain
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Appended to every password before hashing
    #[serde(default = "default_pepper")]
    pub pepper: String,

    /// Key for remember-token and reset-token digests
    #[serde(default = "default_hmac_key")]
    pub hmac_key: String,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_pepper() -> String {
    DEV_PEPPER.to_string()
}

fn default_hmac_key() -> String {
    DEV_HMAC_KEY.to_string()
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("pepper", &"<redacted>")
            .field("hmac_key", &"<redacted>")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pepper: default_pepper(),
            hmac_key: default_hmac_key(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl Config {
    /// Reject configurations that must not run in production
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(Error::Config(format!(
                "auth.bcrypt_cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            )));
        }
        if self.auth.hmac_key.is_empty() {
            return Err(Error::Config("auth.hmac_key must not be empty".to_string()));
        }
        if self.server.is_prod() {
            if self.auth.pepper.is_empty() || self.auth.pepper == DEV_PEPPER {
                return Err(Error::Config(
                    "auth.pepper must be set to a deployment secret in prod".to_string(),
                ));
            }
            if self.auth.hmac_key == DEV_HMAC_KEY {
                return Err(Error::Config(
                    "auth.hmac_key must be set to a deployment secret in prod".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_info_without_password() {
        let db = DatabaseConfig::default();
        assert_eq!(
            db.connection_info(),
            "host=localhost port=5432 user=postgres dbname=photobook_dev sslmode=disable"
        );
    }

    #[test]
    fn test_prod_rejects_dev_secrets() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.server.env = "prod".to_string();
        assert!(config.validate().is_err());

        config.auth.pepper = "real-pepper".to_string();
        config.auth.hmac_key = "real-key".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            auth: AuthConfig {
                pepper: "real-pepper".to_string(),
                hmac_key: "real-hmac-key".to_string(),
                bcrypt_cost: 10,
            },
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("real-pepper"));
        assert!(!debug.contains("real-hmac-key"));
        assert!(debug.contains("bcrypt_cost: 10"));
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        let mut config = Config::default();
        config.auth.bcrypt_cost = 3;
        assert!(config.validate().is_err());
    }
}
