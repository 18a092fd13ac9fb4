//! Video metadata repository.
//!
//! The ingestion path inserts pending rows inside an explicit transaction:
//! the record must be durable before the convert command is published to the
//! broker. Completion is a single idempotent UPDATE keyed on the uuid
//! column.

use sqlx::PgPool;
use uuid::Uuid;

use clipflow_core::models::VideoRecord;
use clipflow_core::AppError;

#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending record for a freshly ingested upload.
    ///
    /// Commits before returning; the caller may only publish the convert
    /// command once this has succeeded.
    pub async fn insert_pending(&self, uuid: Uuid, author_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO videos_info (uuid, author_id, is_complete) VALUES ($1, $2, FALSE)",
        )
        .bind(uuid)
        .bind(author_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(uuid = %uuid, author_id, "Inserted pending video record");
        Ok(())
    }

    /// Flip `is_complete` to true. Idempotent: returns the number of rows
    /// affected, zero when the uuid is unknown or already complete-marked
    /// by an earlier delivery.
    pub async fn mark_complete(&self, uuid: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE videos_info SET is_complete = TRUE WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        let rows = result.rows_affected();
        if rows == 0 {
            tracing::warn!(uuid = %uuid, "Completion confirmed for unknown video record");
        } else {
            tracing::info!(uuid = %uuid, "Video record marked complete");
        }
        Ok(rows)
    }

    pub async fn get_by_uuid(&self, uuid: Uuid) -> Result<Option<VideoRecord>, AppError> {
        let record = sqlx::query_as::<_, VideoRecord>(
            "SELECT uuid, author_id, created_at, is_complete, likes_count, dislikes_count, views_count \
             FROM videos_info WHERE uuid = $1",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Author listing. Like the global listing, only completed records are
    /// visible.
    pub async fn list_by_author(
        &self,
        author_id: i64,
        offset: i64,
        count: i64,
    ) -> Result<Vec<VideoRecord>, AppError> {
        let records = sqlx::query_as::<_, VideoRecord>(
            "SELECT uuid, author_id, created_at, is_complete, likes_count, dislikes_count, views_count \
             FROM videos_info WHERE author_id = $1 AND is_complete \
             ORDER BY created_at DESC OFFSET $2 LIMIT $3",
        )
        .bind(author_id)
        .bind(offset)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Paginated listing of completed records, newest first. Pending
    /// records are invisible until the pipeline confirms them.
    pub async fn list_page(&self, offset: i64, count: i64) -> Result<Vec<VideoRecord>, AppError> {
        let records = sqlx::query_as::<_, VideoRecord>(
            "SELECT uuid, author_id, created_at, is_complete, likes_count, dislikes_count, views_count \
             FROM videos_info WHERE is_complete ORDER BY created_at DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn get_batch(&self, uuids: &[Uuid]) -> Result<Vec<VideoRecord>, AppError> {
        let records = sqlx::query_as::<_, VideoRecord>(
            "SELECT uuid, author_id, created_at, is_complete, likes_count, dislikes_count, views_count \
             FROM videos_info WHERE uuid = ANY($1)",
        )
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
