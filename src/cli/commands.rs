//! CLI command implementations

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::cli::{error, info, success, warn};
use crate::config::{self, loader::CONFIG_FILENAME};
use crate::models::Services;

/// Initialize a new photobook.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Set auth.pepper and auth.hmac_key, then run 'photobook serve'");

    Ok(())
}

/// Migrate the schema and run the HTTP server
pub async fn serve(prod: bool, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = config::load_config_or_default(prod)?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!("Starting server on http://{}:{}", host, port));
    crate::api::run_server(config, &host, port).await?;
    Ok(())
}

/// Create any missing tables
pub async fn migrate(prod: bool) -> Result<()> {
    let config = config::load_config_or_default(prod)?;
    let services = Services::from_config(&config).await?;

    match services.auto_migrate().await {
        Ok(()) => {
            success("Schema is up to date");
            Ok(())
        }
        Err(e) => {
            error(&format!("Migration failed: {}", e));
            Err(e.into())
        }
    }
}

/// Drop and rebuild every table
pub async fn reset(prod: bool, force: bool) -> Result<()> {
    if !force {
        warn("This drops every table and all data. Re-run with --force to continue.");
        return Ok(());
    }

    let config = config::load_config_or_default(prod)?;
    if config.server.is_prod() {
        error("Refusing to reset a production database");
        anyhow::bail!("reset is disabled when server.env = \"prod\"");
    }

    let services = Services::from_config(&config).await?;
    services.destructive_reset().await?;
    success("Dropped and recreated all tables");
    Ok(())
}
