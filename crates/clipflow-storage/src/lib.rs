//! S3-compatible object storage: the `Storage` seam, the aws-sdk-s3
//! implementation, and bucket bootstrap for the public HLS prefix.

pub mod content_type;
pub mod s3;
pub mod traits;

pub use content_type::content_type_for;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};

/// Object-store prefix holding processed HLS trees. Everything under it is
/// world-readable; all other prefixes stay private.
pub const VIDEO_FILES_PREFIX: &str = "video_files";
