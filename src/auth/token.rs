//! Random token generation

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rand::rngs::SysRng;
use rand::TryRng;

use crate::error::{Error, Result};

/// Bytes of entropy in a remember or reset token
pub const REMEMBER_TOKEN_BYTES: usize = 32;

/// Source of random bytes for tokens
pub trait TokenSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// Reads straight from the operating system's entropy source, reporting
/// failures instead of panicking
#[derive(Debug, Default, Clone, Copy)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        SysRng
            .try_fill_bytes(buf)
            .map_err(|e| Error::TokenGeneration(e.to_string()))
    }
}

/// Generate `byte_length` random bytes from `source`, base64-URL encoded
pub fn generate_token_with(source: &dyn TokenSource, byte_length: usize) -> Result<String> {
    if byte_length == 0 {
        return Err(Error::TokenGeneration(
            "byte length must be positive".to_string(),
        ));
    }
    let mut bytes = vec![0u8; byte_length];
    source.fill(&mut bytes)?;
    Ok(URL_SAFE.encode(bytes))
}

/// Generate `byte_length` random bytes from the OS, base64-URL encoded
pub fn generate_token(byte_length: usize) -> Result<String> {
    generate_token_with(&OsTokenSource, byte_length)
}

/// A fresh remember token
pub fn remember_token() -> Result<String> {
    generate_token(REMEMBER_TOKEN_BYTES)
}

/// Number of bytes carried by a base64-URL token
pub fn n_bytes(token: &str) -> Result<usize> {
    URL_SAFE
        .decode(token)
        .map(|bytes| bytes.len())
        .map_err(|_| Error::TokenInvalid)
}
