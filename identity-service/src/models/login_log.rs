//! Session ledger entry. Append-only: rows are closed (logout_time set) or
//! soft-deleted by retention, never rewritten otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Free-form context captured at login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginContext {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LoginLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub login_data: serde_json::Value,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl LoginLog {
    /// An entry is open until its logout timestamp is set.
    pub fn is_open(&self) -> bool {
        self.logout_time.is_none()
    }
}

/// Ledger entry as returned by the login-history endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginLogResponse {
    pub id: Uuid,
    pub login_data: serde_json::Value,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
}

impl From<LoginLog> for LoginLogResponse {
    fn from(l: LoginLog) -> Self {
        Self {
            id: l.id,
            login_data: l.login_data,
            login_time: l.login_time,
            logout_time: l.logout_time,
        }
    }
}
