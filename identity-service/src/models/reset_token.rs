//! Password reset token. Single use, time-boxed, bound to one user; only
//! the sha256 of the issued token is stored.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Build a record for an already-generated token value.
    pub fn new(user_id: Uuid, token: &str, ttl_minutes: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: Self::hash_token(token),
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
            used_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn hash_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_hash_not_token() {
        let token = "a1b2c3d4";
        let record = PasswordResetToken::new(Uuid::new_v4(), token, 30);
        assert_ne!(record.token_hash, token);
        assert_eq!(record.token_hash, PasswordResetToken::hash_token(token));
        assert!(!record.is_expired());
        assert!(!record.is_used());
    }

    #[test]
    fn zero_ttl_is_already_expired() {
        let record = PasswordResetToken::new(Uuid::new_v4(), "t", 0);
        assert!(record.is_expired());
    }
}
