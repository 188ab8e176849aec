//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "photobook.toml";

/// Load configuration from photobook.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load photobook.toml if there is one, otherwise fall back to defaults.
/// Production runs must have a config file.
pub fn load_config_or_default(prod: bool) -> Result<Config> {
    let config = match load_config() {
        Ok(config) => config,
        Err(Error::ConfigNotFound) if !prod => {
            tracing::warn!("{} not found, using development defaults", CONFIG_FILENAME);
            Config::default()
        }
        Err(e) => return Err(e),
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // Constant pattern; a failure here is a bug in this file
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# Photobook Configuration

[server]
host = "0.0.0.0"
port = 3000
env = "dev"  # "prod" rejects the development secrets below
images_dir = "./images"
request_timeout_secs = 30

[database]
backend = "postgres"  # or "memory" for throwaway local runs
host = "${PHOTOBOOK_DB_HOST:-localhost}"
port = 5432
user = "${PHOTOBOOK_DB_USER:-postgres}"
password = "${PHOTOBOOK_DB_PASSWORD:-}"
name = "photobook_dev"

[auth]
# Both values are deployment secrets. Changing the pepper invalidates every
# stored password, changing the hmac key logs everybody out.
pepper = "${PHOTOBOOK_PEPPER:-dev-pepper-change-me}"
hmac_key = "${PHOTOBOOK_HMAC_KEY:-dev-hmac-key-change-me}"
bcrypt_cost = 12
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_interpolation() {
        env::set_var("PHOTOBOOK_TEST_VAR", "hello");
        let content = "value = \"${PHOTOBOOK_TEST_VAR}\"";
        let result = interpolate_env_vars(content);
        assert_eq!(result, "value = \"hello\"");
        env::remove_var("PHOTOBOOK_TEST_VAR");
    }

    #[test]
    fn test_env_interpolation_with_default() {
        let content = "value = \"${NONEXISTENT_VAR:-default_value}\"";
        let result = interpolate_env_vars(content);
        assert_eq!(result, "value = \"default_value\"");
    }

    #[test]
    fn test_default_content_parses() {
        let content = interpolate_env_vars(default_config_content());
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.bcrypt_cost, 12);
        assert!(config.validate().is_ok());
    }
}
