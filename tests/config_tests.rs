//! Configuration loading tests
//!
//! Run with: cargo test --test config_tests

use std::fs;

use photobook::config::{load_config_from_path, StorageBackend};
use photobook::error::Error;
use tempfile::TempDir;

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("photobook.toml");
    fs::write(
        &path,
        r#"
[server]
port = 8080
env = "prod"
images_dir = "/srv/images"

[database]
backend = "memory"

[auth]
pepper = "deploy-pepper"
hmac_key = "deploy-hmac"
bcrypt_cost = 12
"#,
    )
    .unwrap();

    let config = load_config_from_path(&path).expect("Failed to load config");
    assert_eq!(config.server.port, 8080);
    assert!(config.server.is_prod());
    assert_eq!(config.database.backend, StorageBackend::Memory);
    assert_eq!(config.auth.bcrypt_cost, 12);
    assert!(config.validate().is_ok());
    println!("✓ Full config loads and validates");
}

#[test]
fn test_missing_sections_use_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photobook.toml");
    fs::write(&path, "[server]\nport = 4000\n").unwrap();

    let config = load_config_from_path(&path).unwrap();
    assert_eq!(config.server.port, 4000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.database.backend, StorageBackend::Postgres);
    assert!(config.validate().is_ok());
    println!("✓ Missing sections fall back to defaults");
}

#[test]
fn test_env_defaults_are_interpolated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photobook.toml");
    fs::write(
        &path,
        "[auth]\nhmac_key = \"${PHOTOBOOK_TEST_UNSET_HMAC_KEY:-fallback-key}\"\n",
    )
    .unwrap();

    let config = load_config_from_path(&path).unwrap();
    assert_eq!(config.auth.hmac_key, "fallback-key");
    println!("✓ ${{VAR:-default}} interpolation");
}

#[test]
fn test_prod_with_dev_secrets_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photobook.toml");
    fs::write(&path, "[server]\nenv = \"prod\"\n").unwrap();

    let config = load_config_from_path(&path).unwrap();
    assert!(matches!(config.validate(), Err(Error::Config(_))));
    println!("✓ Production refuses development secrets");
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = load_config_from_path(&dir.path().join("nope.toml"));
    assert!(matches!(result, Err(Error::ConfigNotFound)));
}

#[test]
fn test_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photobook.toml");
    fs::write(&path, "[server\nport = ").unwrap();

    assert!(matches!(
        load_config_from_path(&path),
        Err(Error::TomlParse(_))
    ));
}
