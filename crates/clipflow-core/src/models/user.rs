use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row in `users`.
///
/// `token_version` is bumped on password change; tokens minted before the
/// bump fail the version check and are effectively revoked.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub avatar_path: Option<String>,
    pub token_version: i64,
}
