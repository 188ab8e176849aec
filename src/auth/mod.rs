//! Authentication: tokens, keyed hashing, password hashing and the
//! per-request session chain

pub mod context;
pub mod keyed_hash;
pub mod middleware;
pub mod password;
pub mod token;

pub use context::{CurrentUser, MaybeUser, LOGIN_PATH};
pub use keyed_hash::KeyedHasher;
pub use middleware::{require_user, resolve_user, REMEMBER_COOKIE};
pub use password::PasswordHasher;
pub use token::{generate_token, remember_token, TokenSource};
