use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row in `videos_info`.
///
/// `is_complete` transitions false → true exactly once, when the transcoder
/// worker confirms the HLS tree was written. Engagement counters are owned
/// by other subsystems and never go negative.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VideoRecord {
    pub uuid: Uuid,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub is_complete: bool,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub views_count: i64,
}

impl VideoRecord {
    /// Object-store prefix of the processed HLS tree for this record.
    pub fn hls_prefix(&self) -> String {
        format!("video_files/{}", self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hls_prefix_uses_the_record_uuid() {
        let record = VideoRecord {
            uuid: "11111111-1111-4111-8111-111111111111".parse().unwrap(),
            author_id: 1,
            created_at: Utc::now(),
            is_complete: false,
            likes_count: 0,
            dislikes_count: 0,
            views_count: 0,
        };
        assert_eq!(
            record.hls_prefix(),
            "video_files/11111111-1111-4111-8111-111111111111"
        );
    }
}
