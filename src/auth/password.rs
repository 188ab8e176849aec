//! Peppered bcrypt password hashing

use crate::error::{Error, Result};

/// bcrypt ignores input past this many bytes
pub const BCRYPT_MAX_BYTES: usize = 72;

/// Hashes `password + pepper` with bcrypt.
///
/// Peppered input longer than [`BCRYPT_MAX_BYTES`] is refused rather than
/// truncated, so the pepper always takes part in the hash.
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: String,
    cost: u32,
}

impl PasswordHasher {
    pub fn new(pepper: impl Into<String>, cost: u32) -> Self {
        Self {
            pepper: pepper.into(),
            cost,
        }
    }

    /// Whether `password` plus the pepper fits in a bcrypt input
    pub fn fits(&self, password: &str) -> bool {
        password.len() + self.pepper.len() <= BCRYPT_MAX_BYTES
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        if !self.fits(password) {
            return Err(Error::PasswordTooLong);
        }
        Ok(bcrypt::hash(self.peppered(password), self.cost)?)
    }

    /// Check `password` against a stored hash. bcrypt compares digests in
    /// constant time.
    pub fn verify(&self, password: &str, hash: &str) -> Result<()> {
        // Nothing this long was ever hashed
        if !self.fits(password) {
            return Err(Error::PasswordIncorrect);
        }
        match bcrypt::verify(self.peppered(password), hash) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::PasswordIncorrect),
            Err(e) => Err(e.into()),
        }
    }

    fn peppered(&self, password: &str) -> String {
        format!("{}{}", password, self.pepper)
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
