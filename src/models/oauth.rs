//! Stored OAuth credentials, at most one per (user, service)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::OAuthStore;

/// Service name for Dropbox credentials
pub const OAUTH_DROPBOX: &str = "dropbox";

/// Token payload as returned by the provider's token endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuth {
    pub id: i64,
    pub user_id: i64,
    pub service: String,
    #[serde(skip_serializing)]
    pub token: OAuthToken,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type OAuthValFn = fn(&OAuth) -> Result<()>;

fn run_oauth_val_fns(oauth: &OAuth, fns: &[OAuthValFn]) -> Result<()> {
    for f in fns {
        f(oauth)?;
    }
    Ok(())
}

fn user_id_required(oauth: &OAuth) -> Result<()> {
    if oauth.user_id <= 0 {
        return Err(Error::UserIdRequired);
    }
    Ok(())
}

fn service_required(oauth: &OAuth) -> Result<()> {
    if oauth.service.is_empty() {
        return Err(Error::ServiceRequired);
    }
    Ok(())
}

pub struct OAuthService {
    store: Arc<dyn OAuthStore>,
}

impl OAuthService {
    pub fn new(store: Arc<dyn OAuthStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, user_id: i64, service: &str) -> Result<OAuth> {
        self.store.find(user_id, service).await
    }

    pub async fn create(&self, oauth: &mut OAuth) -> Result<()> {
        run_oauth_val_fns(oauth, &[user_id_required, service_required])?;
        self.store.create(oauth).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id <= 0 {
            return Err(Error::InvalidId);
        }
        self.store.delete(id).await
    }

    /// Store `token` as the user's credential for `service`, replacing any
    /// credential already held for that pair.
    pub async fn connect(&self, user_id: i64, service: &str, token: OAuthToken) -> Result<OAuth> {
        match self.find(user_id, service).await {
            Ok(existing) => {
                tracing::debug!(user_id, service, "Replacing existing OAuth credential");
                self.delete(existing.id).await?;
            }
            Err(Error::NotFound) => {}
            Err(e) => return Err(e),
        }

        let mut oauth = OAuth {
            user_id,
            service: service.to_string(),
            token,
            ..Default::default()
        };
        self.create(&mut oauth).await?;
        Ok(oauth)
    }
}
