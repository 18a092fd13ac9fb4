//! The per-job pipeline: download, probe, transcode the ladder, upload the
//! HLS tree, delete the source.
//!
//! Every step is idempotent under overwrite, so a redelivered job converges
//! to the same final object-store state. The temp directory is removed on
//! every exit path by its Drop guard.

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use clipflow_storage::{content_type_for, Storage, VIDEO_FILES_PREFIX};

use crate::error::JobError;
use crate::hls::{master_playlist, HlsTranscoder};
use crate::ladder::build_ladder;
use crate::probe::probe_resolution;

pub struct VideoPipeline {
    storage: Arc<dyn Storage>,
    transcoder: HlsTranscoder,
    ffprobe_path: String,
}

/// Local filename for the downloaded source blob.
fn source_filename(video_path: &str) -> &str {
    match video_path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => "source",
    }
}

impl VideoPipeline {
    pub fn new(storage: Arc<dyn Storage>, transcoder: HlsTranscoder, ffprobe_path: String) -> Self {
        Self {
            storage,
            transcoder,
            ffprobe_path,
        }
    }

    /// Run the full pipeline for one job. On success the HLS tree is in
    /// object storage and the source blob is gone; the caller publishes the
    /// confirmation and acknowledges the message afterwards.
    pub async fn process(&self, uuid: Uuid, video_path: &str) -> Result<(), JobError> {
        tracing::info!(uuid = %uuid, video_path = %video_path, "Starting video processing");

        let temp_dir = tempfile::Builder::new()
            .prefix(&uuid.to_string())
            .tempdir()?;
        let input = temp_dir.path().join(source_filename(video_path));

        let size = self.storage.download_to_file(video_path, &input).await?;
        tracing::info!(uuid = %uuid, size_bytes = size, "Source downloaded");

        let (width, height) = probe_resolution(&self.ffprobe_path, &input).await?;
        let ladder = build_ladder(width, height);
        tracing::info!(
            uuid = %uuid,
            resolution = %format!("{}x{}", width, height),
            renditions = ladder.len(),
            "Rendition ladder selected"
        );

        let output_dir = temp_dir.path().join("hls");
        tokio::fs::create_dir_all(&output_dir).await?;

        // Renditions run sequentially to cap CPU pressure; scaling is by
        // worker replicas.
        for rendition in &ladder {
            self.transcoder
                .transcode_rendition(&input, *rendition, uuid, &output_dir)
                .await?;
        }

        tokio::fs::write(
            output_dir.join("master.m3u8"),
            master_playlist(uuid, &ladder),
        )
        .await?;

        self.upload_tree(uuid, &output_dir).await?;

        self.storage.delete(video_path).await?;
        tracing::info!(uuid = %uuid, video_path = %video_path, "Source deleted");

        tracing::info!(uuid = %uuid, "Video processing completed");
        Ok(())
    }

    /// Upload every file under the local `hls/` directory to
    /// `video_files/<uuid>/<filename>`, overwriting leftovers from any
    /// crashed previous attempt.
    async fn upload_tree(&self, uuid: Uuid, output_dir: &Path) -> Result<(), JobError> {
        let mut uploaded = 0usize;
        let mut entries = tokio::fs::read_dir(output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let key = format!("{}/{}/{}", VIDEO_FILES_PREFIX, uuid, filename);
            self.storage
                .upload_file(&key, &path, content_type_for(&filename))
                .await?;
            uploaded += 1;
        }

        tracing::info!(uuid = %uuid, files = uploaded, "HLS tree uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_filename_takes_the_basename() {
        assert_eq!(source_filename("raw/a.mp4"), "a.mp4");
        assert_eq!(source_filename("a.mp4"), "a.mp4");
        assert_eq!(source_filename("deep/nested/path/b.mkv"), "b.mkv");
    }

    #[test]
    fn source_filename_survives_odd_keys() {
        assert_eq!(source_filename("raw/"), "source");
        assert_eq!(source_filename(""), "source");
    }
}
