//! All services wired to one storage backend

use std::path::PathBuf;
use std::sync::Arc;

use super::{GalleryService, ImageService, OAuthService, UserService};
use crate::config::{AuthConfig, Config, StorageBackend};
use crate::error::Result;
use crate::store::{MemoryStore, Migrator, PgStore, Store};

pub struct Services {
    pub user: Arc<UserService>,
    pub gallery: GalleryService,
    pub oauth: OAuthService,
    pub image: ImageService,
    migrator: Arc<dyn Migrator>,
}

impl Services {
    pub fn new<S>(store: Arc<S>, auth: &AuthConfig, images_dir: impl Into<PathBuf>) -> Self
    where
        S: Store + 'static,
    {
        Self {
            user: Arc::new(UserService::new(store.clone(), store.clone(), auth)),
            gallery: GalleryService::new(store.clone()),
            oauth: OAuthService::new(store.clone()),
            image: ImageService::new(images_dir),
            migrator: store,
        }
    }

    /// Build services over the backend named in the configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let images_dir = config.server.images_dir.clone();
        let services = match config.database.backend {
            StorageBackend::Postgres => {
                let store = PgStore::connect(&config.database).await?;
                Self::new(Arc::new(store), &config.auth, images_dir)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using the in-memory backend, nothing will be persisted");
                Self::new(Arc::new(MemoryStore::new()), &config.auth, images_dir)
            }
        };
        Ok(services)
    }

    /// Create any missing tables
    pub async fn auto_migrate(&self) -> Result<()> {
        self.migrator.auto_migrate().await
    }

    /// Drop every table and rebuild the schema
    pub async fn destructive_reset(&self) -> Result<()> {
        self.migrator.destructive_reset().await
    }
}
