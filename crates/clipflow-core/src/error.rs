//! Error taxonomy shared by all services.
//!
//! Consumers translate every handler error into a broker [`Disposition`]:
//! transient infrastructure failures are requeued, structurally invalid
//! payloads are dropped, and reproducible transcode failures are rejected
//! without requeue so a broken input cannot loop forever.

use sqlx::Error as SqlxError;

/// What the consumer loop should do with the message that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Negative-acknowledge with requeue; the broker redelivers.
    Requeue,
    /// Negative-acknowledge without requeue; operators inspect logs.
    Reject,
    /// Acknowledge and drop (poison message).
    Discard,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[source] SqlxError),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("transcode error: {0}")]
    Transcode(String),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn disposition(&self) -> Disposition {
        match self {
            AppError::Database(_)
            | AppError::Broker(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => Disposition::Requeue,
            AppError::Transcode(_) => Disposition::Reject,
            AppError::Payload(_)
            | AppError::InvalidInput(_)
            | AppError::NotFound(_)
            | AppError::Unauthorized(_) => Disposition::Discard,
        }
    }
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Payload(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Payload(format!("UUID parsing error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_requeue() {
        assert_eq!(
            AppError::Database(sqlx::Error::PoolClosed).disposition(),
            Disposition::Requeue
        );
        assert_eq!(
            AppError::Broker("connection reset".to_string()).disposition(),
            Disposition::Requeue
        );
        assert_eq!(
            AppError::Storage("503".to_string()).disposition(),
            Disposition::Requeue
        );
    }

    #[test]
    fn data_errors_discard() {
        assert_eq!(
            AppError::Payload("missing video_path".to_string()).disposition(),
            Disposition::Discard
        );
        let err: AppError = serde_json::from_slice::<serde_json::Value>(b"{")
            .unwrap_err()
            .into();
        assert_eq!(err.disposition(), Disposition::Discard);
    }

    #[test]
    fn transcode_failures_reject_without_requeue() {
        assert_eq!(
            AppError::Transcode("ffmpeg exited with code 1".to_string()).disposition(),
            Disposition::Reject
        );
    }
}
