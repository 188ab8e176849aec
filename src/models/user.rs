//! Users and the validation pipeline in front of their storage
//!
//! Every write runs an ordered list of independent steps against the
//! candidate [`User`]. The first failing step's error is returned and storage
//! is never reached. Plaintext secrets (`password`, `remember`) only exist on
//! the in-memory record: the pipeline derives `password_hash` and
//! `remember_hash` from them and clears them before anything is persisted.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::keyed_hash::KeyedHasher;
use crate::auth::password::PasswordHasher;
use crate::auth::token::{self, OsTokenSource, TokenSource, REMEMBER_TOKEN_BYTES};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::models::pw_reset::PwReset;
use crate::store::{PwResetStore, UserStore};

/// Minimum plaintext password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a password reset token stays valid
pub const RESET_TOKEN_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Plaintext, only present between form input and hashing
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub password_hash: String,
    /// Plaintext remember token, never persisted
    #[serde(skip)]
    pub remember: String,
    #[serde(skip)]
    pub remember_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }
}

type UserValFn = fn(&UserValidator, &mut User) -> Result<()>;

/// Stateless steps that normalise and check a user before it is written
struct UserValidator {
    passwords: PasswordHasher,
    hmac: KeyedHasher,
    tokens: Arc<dyn TokenSource>,
    email_re: Regex,
}

impl UserValidator {
    fn new(auth: &AuthConfig) -> Self {
        Self {
            passwords: PasswordHasher::new(auth.pepper.clone(), auth.bcrypt_cost),
            hmac: KeyedHasher::new(&auth.hmac_key),
            tokens: Arc::new(OsTokenSource),
            // Constant pattern; a failure here is a bug in this file
            email_re: Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,16}$")
                .expect("Invalid regex pattern - this is a bug in the codebase"),
        }
    }

    fn run(&self, user: &mut User, fns: &[UserValFn]) -> Result<()> {
        for f in fns {
            f(self, user)?;
        }
        Ok(())
    }

    fn password_required(&self, user: &mut User) -> Result<()> {
        if user.password.is_empty() {
            return Err(Error::PasswordRequired);
        }
        Ok(())
    }

    fn password_min_length(&self, user: &mut User) -> Result<()> {
        if !user.password.is_empty() && user.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::PasswordTooShort);
        }
        Ok(())
    }

    fn password_max_length(&self, user: &mut User) -> Result<()> {
        if !user.password.is_empty() && !self.passwords.fits(&user.password) {
            return Err(Error::PasswordTooLong);
        }
        Ok(())
    }

    /// Hash `password + pepper` and drop the plaintext
    fn bcrypt_password(&self, user: &mut User) -> Result<()> {
        if user.password.is_empty() {
            return Ok(());
        }
        user.password_hash = self.passwords.hash(&user.password)?;
        user.password.clear();
        Ok(())
    }

    fn password_hash_required(&self, user: &mut User) -> Result<()> {
        if user.password_hash.is_empty() {
            return Err(Error::PasswordHashRequired);
        }
        Ok(())
    }

    fn set_remember_if_unset(&self, user: &mut User) -> Result<()> {
        if user.remember.is_empty() {
            user.remember = token::generate_token_with(self.tokens.as_ref(), REMEMBER_TOKEN_BYTES)?;
        }
        Ok(())
    }

    fn remember_min_bytes(&self, user: &mut User) -> Result<()> {
        if user.remember.is_empty() {
            return Ok(());
        }
        match token::n_bytes(&user.remember) {
            Ok(n) if n >= REMEMBER_TOKEN_BYTES => Ok(()),
            _ => Err(Error::RememberTooShort),
        }
    }

    fn hmac_remember(&self, user: &mut User) -> Result<()> {
        if user.remember.is_empty() {
            return Ok(());
        }
        user.remember_hash = self.hmac.hash(&user.remember);
        Ok(())
    }

    fn remember_hash_required(&self, user: &mut User) -> Result<()> {
        if user.remember_hash.is_empty() {
            return Err(Error::RememberRequired);
        }
        Ok(())
    }

    fn normalize_email(&self, user: &mut User) -> Result<()> {
        user.email = user.email.trim().to_lowercase();
        Ok(())
    }

    fn require_email(&self, user: &mut User) -> Result<()> {
        if user.email.is_empty() {
            return Err(Error::EmailRequired);
        }
        Ok(())
    }

    fn email_format(&self, user: &mut User) -> Result<()> {
        if !self.email_re.is_match(&user.email) {
            return Err(Error::EmailInvalid);
        }
        Ok(())
    }
}

/// Identity operations: account writes, login, remember-token lookups and
/// password resets.
pub struct UserService {
    store: Arc<dyn UserStore>,
    resets: Arc<dyn PwResetStore>,
    validator: UserValidator,
    reset_ttl: Duration,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        resets: Arc<dyn PwResetStore>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            store,
            resets,
            validator: UserValidator::new(auth),
            reset_ttl: Duration::hours(RESET_TOKEN_TTL_HOURS),
        }
    }

    /// Replace the entropy source used for remember and reset tokens
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.validator.tokens = tokens;
        self
    }

    pub fn with_reset_ttl(mut self, ttl: Duration) -> Self {
        self.reset_ttl = ttl;
        self
    }

    /// The keyed hash stored for `token`
    pub fn remember_hash(&self, token: &str) -> String {
        self.validator.hmac.hash(token)
    }

    pub async fn by_id(&self, id: i64) -> Result<User> {
        self.store.by_id(id).await
    }

    pub async fn by_email(&self, email: &str) -> Result<User> {
        self.store.by_email(&email.trim().to_lowercase()).await
    }

    /// Look up the user whose remember hash matches `token`
    pub async fn by_remember(&self, token: &str) -> Result<User> {
        let remember_hash = self.validator.hmac.hash(token);
        self.store.by_remember_hash(&remember_hash).await
    }

    /// Returns `Error::NotFound` for an unknown email and
    /// `Error::PasswordIncorrect` when the password does not match.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = self.by_email(email).await?;
        self.validator.passwords.verify(password, &user.password_hash)?;
        Ok(user)
    }

    /// Validate and insert `user`, backfilling `id` and timestamps.
    ///
    /// A remember token is generated when none was set. The plaintext token is
    /// cleared from `user` and handed back so the caller can put it in a
    /// cookie.
    pub async fn create(&self, user: &mut User) -> Result<String> {
        self.validator.run(
            user,
            &[
                UserValidator::password_required,
                UserValidator::password_min_length,
                UserValidator::password_max_length,
                UserValidator::bcrypt_password,
                UserValidator::password_hash_required,
                UserValidator::set_remember_if_unset,
                UserValidator::remember_min_bytes,
                UserValidator::hmac_remember,
                UserValidator::remember_hash_required,
                UserValidator::normalize_email,
                UserValidator::require_email,
                UserValidator::email_format,
            ],
        )?;
        self.email_is_avail(user).await?;

        let remember = std::mem::take(&mut user.remember);
        self.store.create(user).await?;
        tracing::info!(user_id = user.id, "Created user");
        Ok(remember)
    }

    /// Validate and save every field of `user`. Without a plaintext remember
    /// token the stored remember hash is left as it is.
    pub async fn update(&self, user: &mut User) -> Result<()> {
        self.validator.run(
            user,
            &[
                UserValidator::password_min_length,
                UserValidator::password_max_length,
                UserValidator::bcrypt_password,
                UserValidator::password_hash_required,
                UserValidator::remember_min_bytes,
                UserValidator::hmac_remember,
                UserValidator::remember_hash_required,
                UserValidator::normalize_email,
                UserValidator::require_email,
                UserValidator::email_format,
            ],
        )?;
        self.email_is_avail(user).await?;

        user.remember.clear();
        self.store.update(user).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id <= 0 {
            return Err(Error::InvalidId);
        }
        self.store.delete(id).await
    }

    /// Give `user` a fresh remember token and persist its hash. Any cookie
    /// carrying the previous token stops resolving.
    pub async fn issue_remember_token(&self, user: &mut User) -> Result<String> {
        let remember =
            token::generate_token_with(self.validator.tokens.as_ref(), REMEMBER_TOKEN_BYTES)?;
        user.remember = remember.clone();
        self.update(user).await?;
        Ok(remember)
    }

    /// Start a password reset for `email`, returning the plaintext token to
    /// deliver to the account owner.
    pub async fn initiate_reset(&self, email: &str) -> Result<String> {
        let user = self.by_email(email).await?;
        let token =
            token::generate_token_with(self.validator.tokens.as_ref(), REMEMBER_TOKEN_BYTES)?;

        let mut reset = PwReset {
            user_id: user.id,
            token_hash: self.validator.hmac.hash(&token),
            ..Default::default()
        };
        self.resets.create(&mut reset).await?;
        tracing::info!(user_id = user.id, "Password reset initiated");
        Ok(token)
    }

    /// Set a new password using a reset token. Unknown and expired tokens
    /// fail with `Error::TokenInvalid`.
    pub async fn complete_reset(&self, token: &str, new_password: &str) -> Result<User> {
        let token_hash = self.validator.hmac.hash(token);
        let reset = match self.resets.by_token_hash(&token_hash).await {
            Ok(reset) => reset,
            Err(Error::NotFound) => return Err(Error::TokenInvalid),
            Err(e) => return Err(e),
        };

        if reset_expired(reset.created_at, Utc::now(), self.reset_ttl) {
            self.resets.delete(reset.id).await?;
            return Err(Error::TokenInvalid);
        }

        let mut user = self.store.by_id(reset.user_id).await?;
        user.password = new_password.to_string();
        self.update(&mut user).await?;
        self.resets.delete(reset.id).await?;
        tracing::info!(user_id = user.id, "Password reset completed");
        Ok(user)
    }

    async fn email_is_avail(&self, user: &User) -> Result<()> {
        match self.store.by_email(&user.email).await {
            Ok(existing) if existing.id != user.id => Err(Error::EmailTaken),
            Ok(_) | Err(Error::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn reset_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - created_at > ttl
}
