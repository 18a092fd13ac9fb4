//! Idempotent schema bootstrap, executed at service startup.

use sqlx::PgPool;

use clipflow_core::AppError;

const CREATE_VIDEOS_INFO: &str = r#"
CREATE TABLE IF NOT EXISTS videos_info (
    uuid            UUID PRIMARY KEY,
    author_id       BIGINT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    is_complete     BOOLEAN NOT NULL DEFAULT FALSE,
    likes_count     BIGINT NOT NULL DEFAULT 0 CHECK (likes_count >= 0),
    dislikes_count  BIGINT NOT NULL DEFAULT 0 CHECK (dislikes_count >= 0),
    views_count     BIGINT NOT NULL DEFAULT 0 CHECK (views_count >= 0)
)
"#;

const CREATE_VIDEOS_INFO_AUTHOR_IDX: &str =
    "CREATE INDEX IF NOT EXISTS idx_videos_info_author_id ON videos_info (author_id)";

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id             BIGSERIAL PRIMARY KEY,
    username       VARCHAR(32) NOT NULL UNIQUE,
    email          VARCHAR(254) NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    avatar_path    TEXT,
    token_version  BIGINT NOT NULL DEFAULT 0
)
"#;

/// Create the metadata tables used by the channel service.
pub async fn create_video_tables(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(CREATE_VIDEOS_INFO).execute(pool).await?;
    sqlx::query(CREATE_VIDEOS_INFO_AUTHOR_IDX).execute(pool).await?;
    tracing::debug!("videos_info schema ready");
    Ok(())
}

/// Create the identity tables used by the auth service.
pub async fn create_user_tables(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(CREATE_USERS).execute(pool).await?;
    tracing::debug!("users schema ready");
    Ok(())
}
