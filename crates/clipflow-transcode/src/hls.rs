//! ffmpeg HLS rendering and master playlist synthesis.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use uuid::Uuid;

use crate::error::JobError;
use crate::ladder::{bandwidth_for_height, Rendition};

pub struct HlsTranscoder {
    ffmpeg_path: String,
    segment_seconds: u64,
}

/// Build the ffmpeg argument list for one rendition.
///
/// H.264 baseline level 3.0, `preset=fast`, 5-second segments by default,
/// unbounded playlist size.
fn hls_args(input: &Path, scale: &str, segment_seconds: u64, output: &Path) -> Vec<String> {
    vec![
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-vf".to_string(),
        format!("scale={}", scale),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "fast".to_string(),
        "-profile:v".to_string(),
        "baseline".to_string(),
        "-level".to_string(),
        "3.0".to_string(),
        "-loglevel".to_string(),
        "warning".to_string(),
        "-start_number".to_string(),
        "0".to_string(),
        "-hls_time".to_string(),
        segment_seconds.to_string(),
        "-hls_list_size".to_string(),
        "0".to_string(),
        "-f".to_string(),
        "hls".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

impl HlsTranscoder {
    pub fn new(ffmpeg_path: String, segment_seconds: u64) -> Self {
        Self {
            ffmpeg_path,
            segment_seconds,
        }
    }

    /// Render one rendition into `output_dir`, returning the playlist path.
    ///
    /// The child's stderr is streamed to the log while it runs; the process
    /// must exit 0 and the playlist must exist afterwards.
    pub async fn transcode_rendition(
        &self,
        input: &Path,
        rendition: Rendition,
        uuid: Uuid,
        output_dir: &Path,
    ) -> Result<PathBuf, JobError> {
        let output = output_dir.join(rendition.playlist_name(uuid));
        let scale = rendition.scale();

        tracing::info!(uuid = %uuid, scale = %scale, "Transcoding rendition");

        let mut child = Command::new(&self.ffmpeg_path)
            .args(hls_args(input, &scale, self.segment_seconds, &output))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| JobError::Ffmpeg(format!("failed to run {}: {}", self.ffmpeg_path, e)))?;

        let mut last_stderr_line = String::new();
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await? {
                tracing::debug!(uuid = %uuid, scale = %scale, "ffmpeg: {}", line);
                last_stderr_line = line;
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(JobError::Ffmpeg(format!(
                "ffmpeg exited with {} for scale {}: {}",
                status, scale, last_stderr_line
            )));
        }

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(JobError::MissingOutput(
                output.to_string_lossy().to_string(),
            ));
        }

        tracing::info!(uuid = %uuid, scale = %scale, "Rendition ready");
        Ok(output)
    }
}

/// Multi-variant playlist listing every rendition of the ladder.
pub fn master_playlist(uuid: Uuid, renditions: &[Rendition]) -> String {
    let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    for rendition in renditions {
        playlist.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}\n",
            bandwidth_for_height(rendition.height),
            rendition.width,
            rendition.height,
            rendition.playlist_name(uuid),
        ));
    }
    playlist
}
