use clipflow_core::AppError;
use clipflow_storage::StorageError;

/// Failure of a single transcode job.
///
/// Storage and local I/O failures are transient (the job is requeued);
/// probe and ffmpeg failures are reproducible for a given input, so the
/// message is rejected without requeue.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),

    #[error("expected output missing: {0}")]
    MissingOutput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Storage(e) => AppError::Storage(e.to_string()),
            JobError::Io(e) => AppError::Internal(format!("IO error: {}", e)),
            JobError::Probe(_) | JobError::Ffmpeg(_) | JobError::MissingOutput(_) => {
                AppError::Transcode(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipflow_core::Disposition;

    #[test]
    fn missing_source_is_requeued() {
        let err: AppError = JobError::Storage(StorageError::NotFound("raw/b.mp4".into())).into();
        assert_eq!(err.disposition(), Disposition::Requeue);
    }

    #[test]
    fn ffmpeg_failures_are_rejected() {
        let err: AppError = JobError::Ffmpeg("exited with code 1".into()).into();
        assert_eq!(err.disposition(), Disposition::Reject);
        let err: AppError = JobError::Probe("unparsable output".into()).into();
        assert_eq!(err.disposition(), Disposition::Reject);
    }
}
