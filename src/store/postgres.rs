//! PostgreSQL storage backend

use async_trait::async_trait;
use chrono::Utc;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

use super::{GalleryStore, Migrator, OAuthStore, PwResetStore, UserStore};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::models::{Gallery, OAuth, OAuthToken, PwReset, User};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    remember_hash TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS galleries (
    id BIGSERIAL PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    title TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS galleries_user_id_idx ON galleries (user_id);

CREATE TABLE IF NOT EXISTS oauths (
    id BIGSERIAL PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    service TEXT NOT NULL,
    access_token TEXT NOT NULL DEFAULT '',
    token_type TEXT NOT NULL DEFAULT '',
    refresh_token TEXT NOT NULL DEFAULT '',
    expiry TIMESTAMPTZ,
    UNIQUE (user_id, service)
);

CREATE TABLE IF NOT EXISTS pw_resets (
    id BIGSERIAL PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL,
    user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE
);
"#;

const DROP_SCHEMA: &str = "DROP TABLE IF EXISTS users, galleries, oauths, pw_resets";

/// Record store backed by a single PostgreSQL connection
pub struct PgStore {
    client: Client,
}

impl PgStore {
    /// Connect and spawn the connection driver
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let (client, connection) =
            tokio_postgres::connect(&config.connection_info(), NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        tracing::info!(
            "Connected to PostgreSQL at {}:{}/{}",
            config.host,
            config.port,
            config.name
        );
        Ok(Self { client })
    }

    /// First row of `query`, or `Error::NotFound` when there are none
    async fn first(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Row> {
        self.client
            .query_opt(query, params)
            .await
            .map_err(storage_error)?
            .ok_or(Error::NotFound)
    }

    async fn execute(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        self.client.execute(query, params).await.map_err(storage_error)
    }
}

/// Unique and foreign-key violations become `Error::Constraint` so both
/// backends report them the same way; everything else passes through.
fn storage_error(e: tokio_postgres::Error) -> Error {
    let code = e.code();
    if code == Some(&SqlState::UNIQUE_VIOLATION) || code == Some(&SqlState::FOREIGN_KEY_VIOLATION)
    {
        let detail = e
            .as_db_error()
            .and_then(|db| db.constraint())
            .unwrap_or("constraint")
            .to_string();
        return Error::Constraint(detail);
    }
    Error::Database(e)
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        remember_hash: row.get("remember_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        ..Default::default()
    }
}

fn gallery_from_row(row: &Row) -> Gallery {
    Gallery {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn oauth_from_row(row: &Row) -> OAuth {
    OAuth {
        id: row.get("id"),
        user_id: row.get("user_id"),
        service: row.get("service"),
        token: OAuthToken {
            access_token: row.get("access_token"),
            token_type: row.get("token_type"),
            refresh_token: row.get("refresh_token"),
            expiry: row.get("expiry"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn pw_reset_from_row(row: &Row) -> PwReset {
    PwReset {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token_hash: row.get("token_hash"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn by_id(&self, id: i64) -> Result<User> {
        let row = self.first("SELECT * FROM users WHERE id = $1", &[&id]).await?;
        Ok(user_from_row(&row))
    }

    async fn by_email(&self, email: &str) -> Result<User> {
        let row = self
            .first("SELECT * FROM users WHERE email = $1", &[&email])
            .await?;
        Ok(user_from_row(&row))
    }

    async fn by_remember_hash(&self, remember_hash: &str) -> Result<User> {
        let row = self
            .first(
                "SELECT * FROM users WHERE remember_hash = $1",
                &[&remember_hash],
            )
            .await?;
        Ok(user_from_row(&row))
    }

    async fn create(&self, user: &mut User) -> Result<()> {
        let now = Utc::now();
        let row = self
            .first(
                "INSERT INTO users (created_at, updated_at, name, email, password_hash, remember_hash) \
                 VALUES ($1, $1, $2, $3, $4, $5) RETURNING id",
                &[
                    &now,
                    &user.name,
                    &user.email,
                    &user.password_hash,
                    &user.remember_hash,
                ],
            )
            .await?;
        user.id = row.get("id");
        user.created_at = now;
        user.updated_at = now;
        Ok(())
    }

    async fn update(&self, user: &mut User) -> Result<()> {
        let now = Utc::now();
        let updated = self
            .execute(
                "UPDATE users SET updated_at = $2, name = $3, email = $4, \
                 password_hash = $5, remember_hash = $6 WHERE id = $1",
                &[
                    &user.id,
                    &now,
                    &user.name,
                    &user.email,
                    &user.password_hash,
                    &user.remember_hash,
                ],
            )
            .await?;
        if updated == 0 {
            return Err(Error::NotFound);
        }
        user.updated_at = now;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.execute("DELETE FROM users WHERE id = $1", &[&id]).await?;
        Ok(())
    }
}

#[async_trait]
impl GalleryStore for PgStore {
    async fn by_id(&self, id: i64) -> Result<Gallery> {
        let row = self
            .first("SELECT * FROM galleries WHERE id = $1", &[&id])
            .await?;
        Ok(gallery_from_row(&row))
    }

    async fn by_user_id(&self, user_id: i64) -> Result<Vec<Gallery>> {
        let rows = self
            .client
            .query(
                "SELECT * FROM galleries WHERE user_id = $1 ORDER BY id",
                &[&user_id],
            )
            .await
            .map_err(storage_error)?;
        Ok(rows.iter().map(gallery_from_row).collect())
    }

    async fn create(&self, gallery: &mut Gallery) -> Result<()> {
        let now = Utc::now();
        let row = self
            .first(
                "INSERT INTO galleries (created_at, updated_at, user_id, title) \
                 VALUES ($1, $1, $2, $3) RETURNING id",
                &[&now, &gallery.user_id, &gallery.title],
            )
            .await?;
        gallery.id = row.get("id");
        gallery.created_at = now;
        gallery.updated_at = now;
        Ok(())
    }

    async fn update(&self, gallery: &mut Gallery) -> Result<()> {
        let now = Utc::now();
        let updated = self
            .execute(
                "UPDATE galleries SET updated_at = $2, user_id = $3, title = $4 WHERE id = $1",
                &[&gallery.id, &now, &gallery.user_id, &gallery.title],
            )
            .await?;
        if updated == 0 {
            return Err(Error::NotFound);
        }
        gallery.updated_at = now;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.execute("DELETE FROM galleries WHERE id = $1", &[&id])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OAuthStore for PgStore {
    async fn find(&self, user_id: i64, service: &str) -> Result<OAuth> {
        let row = self
            .first(
                "SELECT * FROM oauths WHERE user_id = $1 AND service = $2",
                &[&user_id, &service],
            )
            .await?;
        Ok(oauth_from_row(&row))
    }

    async fn create(&self, oauth: &mut OAuth) -> Result<()> {
        let now = Utc::now();
        let row = self
            .first(
                "INSERT INTO oauths (created_at, updated_at, user_id, service, \
                 access_token, token_type, refresh_token, expiry) \
                 VALUES ($1, $1, $2, $3, $4, $5, $6, $7) RETURNING id",
                &[
                    &now,
                    &oauth.user_id,
                    &oauth.service,
                    &oauth.token.access_token,
                    &oauth.token.token_type,
                    &oauth.token.refresh_token,
                    &oauth.token.expiry,
                ],
            )
            .await?;
        oauth.id = row.get("id");
        oauth.created_at = now;
        oauth.updated_at = now;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.execute("DELETE FROM oauths WHERE id = $1", &[&id]).await?;
        Ok(())
    }
}

#[async_trait]
impl PwResetStore for PgStore {
    async fn by_token_hash(&self, token_hash: &str) -> Result<PwReset> {
        let row = self
            .first(
                "SELECT * FROM pw_resets WHERE token_hash = $1",
                &[&token_hash],
            )
            .await?;
        Ok(pw_reset_from_row(&row))
    }

    async fn create(&self, reset: &mut PwReset) -> Result<()> {
        let now = Utc::now();
        let row = self
            .first(
                "INSERT INTO pw_resets (created_at, user_id, token_hash) \
                 VALUES ($1, $2, $3) RETURNING id",
                &[&now, &reset.user_id, &reset.token_hash],
            )
            .await?;
        reset.id = row.get("id");
        reset.created_at = now;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.execute("DELETE FROM pw_resets WHERE id = $1", &[&id])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Migrator for PgStore {
    async fn auto_migrate(&self) -> Result<()> {
        self.client
            .batch_execute(SCHEMA)
            .await
            .map_err(storage_error)?;
        tracing::debug!("Schema migrated");
        Ok(())
    }

    async fn destructive_reset(&self) -> Result<()> {
        self.client
            .batch_execute(DROP_SCHEMA)
            .await
            .map_err(storage_error)?;
        tracing::warn!("Dropped all tables");
        self.auto_migrate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_tables_cascade_from_users() {
        for table in ["galleries", "oauths", "pw_resets"] {
            let start = SCHEMA
                .find(&format!("CREATE TABLE IF NOT EXISTS {} (", table))
                .unwrap();
            let body = &SCHEMA[start..];
            let body = &body[..body.find(");").unwrap()];
            assert!(
                body.contains("user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE"),
                "{} is missing its owner reference",
                table
            );
        }
    }
}
