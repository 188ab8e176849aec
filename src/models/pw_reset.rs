//! Password reset records

use chrono::{DateTime, Utc};

/// A pending password reset. The plaintext token goes to the account owner;
/// only its keyed hash is kept.
#[derive(Debug, Clone, Default)]
pub struct PwReset {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}
