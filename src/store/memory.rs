//! In-memory storage backend
//!
//! Enforces the same unique and foreign-key constraints as the PostgreSQL
//! schema, including cascading user deletes, so the services behave
//! identically on both. Used by the test suite and by
//! `backend = "memory"` development runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{GalleryStore, Migrator, OAuthStore, PwResetStore, UserStore};
use crate::error::{Error, Result};
use crate::models::{Gallery, OAuth, PwReset, User};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    galleries: BTreeMap<i64, Gallery>,
    oauths: BTreeMap<i64, OAuth>,
    pw_resets: BTreeMap<i64, PwReset>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn check_user_unique(&self, user: &User) -> Result<()> {
        for existing in self.users.values().filter(|u| u.id != user.id) {
            if existing.email == user.email {
                return Err(Error::Constraint("users.email".to_string()));
            }
            if existing.remember_hash == user.remember_hash {
                return Err(Error::Constraint("users.remember_hash".to_string()));
            }
        }
        Ok(())
    }

    /// Owned records must point at an existing user
    fn check_owner(&self, table: &str, user_id: i64) -> Result<()> {
        if !self.users.contains_key(&user_id) {
            return Err(Error::Constraint(format!("{}.user_id", table)));
        }
        Ok(())
    }
}

/// Record store held behind a shared lock
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Number of stored galleries
    pub async fn gallery_count(&self) -> usize {
        self.tables.read().await.galleries.len()
    }

    /// Number of stored OAuth credentials
    pub async fn oauth_count(&self) -> usize {
        self.tables.read().await.oauths.len()
    }
}

/// Copy of `user` as it would sit in a table: no plaintext secrets
fn persisted(user: &User) -> User {
    User {
        password: String::new(),
        remember: String::new(),
        ..user.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn by_id(&self, id: i64) -> Result<User> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn by_email(&self, email: &str) -> Result<User> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn by_remember_hash(&self, remember_hash: &str) -> Result<User> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.remember_hash == remember_hash)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn create(&self, user: &mut User) -> Result<()> {
        let mut tables = self.tables.write().await;
        user.id = 0;
        tables.check_user_unique(user)?;

        let now = Utc::now();
        user.id = tables.next_id();
        user.created_at = now;
        user.updated_at = now;
        tables.users.insert(user.id, persisted(user));
        Ok(())
    }

    async fn update(&self, user: &mut User) -> Result<()> {
        let mut tables = self.tables.write().await;
        let created_at = tables
            .users
            .get(&user.id)
            .map(|u| u.created_at)
            .ok_or(Error::NotFound)?;
        tables.check_user_unique(user)?;

        user.created_at = created_at;
        user.updated_at = Utc::now();
        tables.users.insert(user.id, persisted(user));
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_some() {
            tables.galleries.retain(|_, g| g.user_id != id);
            tables.oauths.retain(|_, o| o.user_id != id);
            tables.pw_resets.retain(|_, r| r.user_id != id);
        }
        Ok(())
    }
}

#[async_trait]
impl GalleryStore for MemoryStore {
    async fn by_id(&self, id: i64) -> Result<Gallery> {
        self.tables
            .read()
            .await
            .galleries
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn by_user_id(&self, user_id: i64) -> Result<Vec<Gallery>> {
        Ok(self
            .tables
            .read()
            .await
            .galleries
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, gallery: &mut Gallery) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_owner("galleries", gallery.user_id)?;
        let now = Utc::now();
        gallery.id = tables.next_id();
        gallery.created_at = now;
        gallery.updated_at = now;
        tables.galleries.insert(gallery.id, gallery.clone());
        Ok(())
    }

    async fn update(&self, gallery: &mut Gallery) -> Result<()> {
        let mut tables = self.tables.write().await;
        let created_at = tables
            .galleries
            .get(&gallery.id)
            .map(|g| g.created_at)
            .ok_or(Error::NotFound)?;
        tables.check_owner("galleries", gallery.user_id)?;
        gallery.created_at = created_at;
        gallery.updated_at = Utc::now();
        tables.galleries.insert(gallery.id, gallery.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.tables.write().await.galleries.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OAuthStore for MemoryStore {
    async fn find(&self, user_id: i64, service: &str) -> Result<OAuth> {
        self.tables
            .read()
            .await
            .oauths
            .values()
            .find(|o| o.user_id == user_id && o.service == service)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn create(&self, oauth: &mut OAuth) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_owner("oauths", oauth.user_id)?;
        if tables
            .oauths
            .values()
            .any(|o| o.user_id == oauth.user_id && o.service == oauth.service)
        {
            return Err(Error::Constraint("oauths.user_id_service".to_string()));
        }
        let now = Utc::now();
        oauth.id = tables.next_id();
        oauth.created_at = now;
        oauth.updated_at = now;
        tables.oauths.insert(oauth.id, oauth.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.tables.write().await.oauths.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PwResetStore for MemoryStore {
    async fn by_token_hash(&self, token_hash: &str) -> Result<PwReset> {
        self.tables
            .read()
            .await
            .pw_resets
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn create(&self, reset: &mut PwReset) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_owner("pw_resets", reset.user_id)?;
        if tables
            .pw_resets
            .values()
            .any(|r| r.token_hash == reset.token_hash)
        {
            return Err(Error::Constraint("pw_resets.token_hash".to_string()));
        }
        reset.id = tables.next_id();
        reset.created_at = Utc::now();
        tables.pw_resets.insert(reset.id, reset.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.tables.write().await.pw_resets.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl Migrator for MemoryStore {
    async fn auto_migrate(&self) -> Result<()> {
        Ok(())
    }

    async fn destructive_reset(&self) -> Result<()> {
        *self.tables.write().await = Tables::default();
        Ok(())
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Insert a bare user for owned-record tests and return its id
    pub(crate) async fn seed_user(&self, email: &str) -> i64 {
        let mut user = User {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            remember_hash: format!("remember-{}", email),
            ..Default::default()
        };
        UserStore::create(self, &mut user)
            .await
            .expect("Failed to seed user");
        user.id
    }
}
