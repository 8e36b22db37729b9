//! User model - principal accounts guarded by the credential store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Account status codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }
}

/// User entity. `role_label` is a deprecated cached label kept for token
/// claims; authorization decisions go through the grant relations only.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role_label: Option<String>,
    pub status: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user; status defaults to active.
    pub fn new(name: String, email: String, password_hash: String, phone: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            phone,
            role_label: None,
            status: UserStatus::Active.as_str().to_string(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if the account may authenticate.
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active.as_str() && self.deleted_at.is_none()
    }

    /// Convert to sanitized response (no credential material).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role_label: Option<String>,
    pub status: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            role_label: u.role_label,
            status: u.status,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active() {
        let user = User::new(
            "A".to_string(),
            "a@x.com".to_string(),
            "$argon2id$hash".to_string(),
            None,
        );
        assert!(user.is_active());
        assert_eq!(user.status, "active");
    }

    #[test]
    fn soft_deleted_user_is_not_active() {
        let mut user = User::new(
            "A".to_string(),
            "a@x.com".to_string(),
            "$argon2id$hash".to_string(),
            None,
        );
        user.deleted_at = Some(Utc::now());
        assert!(!user.is_active());
    }

    #[test]
    fn suspended_user_is_not_active() {
        let mut user = User::new(
            "A".to_string(),
            "a@x.com".to_string(),
            "$argon2id$hash".to_string(),
            None,
        );
        user.status = UserStatus::Suspended.as_str().to_string();
        assert!(!user.is_active());
    }

    #[test]
    fn sanitized_drops_credential_material() {
        let user = User::new(
            "A".to_string(),
            "a@x.com".to_string(),
            "$argon2id$hash".to_string(),
            None,
        );
        let value = serde_json::to_value(user.sanitized()).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "a@x.com");
    }
}
