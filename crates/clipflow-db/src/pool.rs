use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use clipflow_core::{AppError, DatabaseSettings};

const MAX_CONNECTIONS: u32 = 20;
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Connect to the metadata store and verify the connection works.
pub async fn connect_pool(settings: &DatabaseSettings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect(&settings.url())
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    tracing::info!(
        host = %settings.host,
        database = %settings.database,
        "Connected to metadata store"
    );
    Ok(pool)
}
