//! Storage contracts and backends
//!
//! The services in [`crate::models`] only ever talk to these traits. Every
//! single-record lookup returns [`Error::NotFound`](crate::error::Error::NotFound)
//! when nothing matches, inserts backfill `id`, `created_at` and `updated_at`,
//! and uniqueness is the backend's job.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Gallery, OAuth, PwReset, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn by_id(&self, id: i64) -> Result<User>;
    async fn by_email(&self, email: &str) -> Result<User>;
    async fn by_remember_hash(&self, remember_hash: &str) -> Result<User>;
    async fn create(&self, user: &mut User) -> Result<()>;
    async fn update(&self, user: &mut User) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait GalleryStore: Send + Sync {
    async fn by_id(&self, id: i64) -> Result<Gallery>;
    async fn by_user_id(&self, user_id: i64) -> Result<Vec<Gallery>>;
    async fn create(&self, gallery: &mut Gallery) -> Result<()>;
    async fn update(&self, gallery: &mut Gallery) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait OAuthStore: Send + Sync {
    async fn find(&self, user_id: i64, service: &str) -> Result<OAuth>;
    async fn create(&self, oauth: &mut OAuth) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait PwResetStore: Send + Sync {
    async fn by_token_hash(&self, token_hash: &str) -> Result<PwReset>;
    async fn create(&self, reset: &mut PwReset) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
}

/// Schema management, run once at process start
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Create any missing tables
    async fn auto_migrate(&self) -> Result<()>;
    /// Drop every table and rebuild the schema
    async fn destructive_reset(&self) -> Result<()>;
}

/// A backend able to hold every record type
pub trait Store: UserStore + GalleryStore + OAuthStore + PwResetStore + Migrator {}

impl<T> Store for T where T: UserStore + GalleryStore + OAuthStore + PwResetStore + Migrator {}
