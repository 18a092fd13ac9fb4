//! End-to-end pipeline tests against stub ffmpeg/ffprobe binaries and an
//! in-memory storage fake.

#![cfg(unix)]

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use clipflow_storage::{Storage, StorageError, StorageResult};
use clipflow_transcode::{HlsTranscoder, JobError, VideoPipeline};

#[derive(Default)]
struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    fn insert(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), data);
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn download_to_file(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        tokio::fs::write(dest, &data)
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        Ok(data.len() as u64)
    }

    async fn upload_file(&self, key: &str, path: &Path, _content_type: &str) -> StorageResult<()> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }
}

fn write_stub(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// ffprobe stub reporting a 1280x720 source.
const FFPROBE_STUB: &str = "#!/bin/sh\necho \"1280,720\"\n";

/// ffmpeg stub creating the playlist (last argument) and one segment.
const FFMPEG_STUB: &str = "#!/bin/sh\nfor last; do :; done\n\
echo \"#EXTM3U\" > \"$last\"\n: > \"${last%.m3u8}0.ts\"\n";

/// ffmpeg stub that exits non-zero without producing output.
const FFMPEG_FAILING_STUB: &str = "#!/bin/sh\necho \"broken input\" >&2\nexit 1\n";

fn pipeline_with_stubs(
    storage: Arc<MemoryStorage>,
    bin_dir: &Path,
    ffmpeg_stub: &str,
) -> VideoPipeline {
    let ffmpeg = write_stub(bin_dir, "ffmpeg", ffmpeg_stub);
    let ffprobe = write_stub(bin_dir, "ffprobe", FFPROBE_STUB);
    VideoPipeline::new(
        storage,
        HlsTranscoder::new(ffmpeg.to_string_lossy().to_string(), 5),
        ffprobe.to_string_lossy().to_string(),
    )
}

#[tokio::test]
async fn pipeline_writes_hls_tree_and_deletes_source() {
    let bin_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::default());
    storage.insert("raw/a.mp4", vec![0u8; 64]);

    let uuid: Uuid = "11111111-1111-4111-8111-111111111111".parse().unwrap();
    let pipeline = pipeline_with_stubs(storage.clone(), bin_dir.path(), FFMPEG_STUB);

    pipeline.process(uuid, "raw/a.mp4").await.unwrap();

    let prefix = format!("video_files/{}", uuid);
    assert!(storage.get(&format!("{}/master.m3u8", prefix)).is_some());
    for height in [720, 480, 360, 240, 144] {
        assert!(
            storage
                .get(&format!("{}/{}p-{}.m3u8", prefix, height, uuid))
                .is_some(),
            "missing {}p playlist",
            height
        );
        assert!(
            storage
                .get(&format!("{}/{}p-{}0.ts", prefix, height, uuid))
                .is_some(),
            "missing {}p segment",
            height
        );
    }

    // 1080p does not fit a 1280x720 source.
    assert!(storage.get(&format!("{}/1080p-{}.m3u8", prefix, uuid)).is_none());

    // Source is deleted after upload.
    assert!(storage.get("raw/a.mp4").is_none());

    // The master playlist lists exactly the uploaded renditions.
    let master = String::from_utf8(storage.get(&format!("{}/master.m3u8", prefix)).unwrap()).unwrap();
    for height in [720, 480, 360, 240, 144] {
        assert!(master.contains(&format!("{}p-{}.m3u8", height, uuid)));
    }
    assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 5);
}

#[tokio::test]
async fn missing_source_fails_without_touching_storage() {
    let bin_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::default());
    let uuid = Uuid::new_v4();
    let pipeline = pipeline_with_stubs(storage.clone(), bin_dir.path(), FFMPEG_STUB);

    let err = pipeline.process(uuid, "raw/missing.mp4").await.unwrap_err();
    assert!(matches!(err, JobError::Storage(StorageError::NotFound(_))));
    assert!(storage.keys().is_empty());
}

#[tokio::test]
async fn ffmpeg_failure_leaves_the_source_in_place() {
    let bin_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::default());
    storage.insert("raw/c.mp4", vec![0u8; 64]);

    let uuid = Uuid::new_v4();
    let pipeline = pipeline_with_stubs(storage.clone(), bin_dir.path(), FFMPEG_FAILING_STUB);

    let err = pipeline.process(uuid, "raw/c.mp4").await.unwrap_err();
    assert!(matches!(err, JobError::Ffmpeg(_)));

    // Nothing uploaded, source untouched.
    assert_eq!(storage.keys(), vec!["raw/c.mp4".to_string()]);
}

#[tokio::test]
async fn reprocessing_converges_to_the_same_state() {
    let bin_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::default());
    storage.insert("raw/d.mp4", vec![0u8; 64]);

    let uuid = Uuid::new_v4();
    let pipeline = pipeline_with_stubs(storage.clone(), bin_dir.path(), FFMPEG_STUB);

    pipeline.process(uuid, "raw/d.mp4").await.unwrap();
    let first = storage.keys();

    // Redelivery: the source is gone, so the retry fails on download and
    // the already-uploaded tree is untouched.
    let err = pipeline.process(uuid, "raw/d.mp4").await.unwrap_err();
    assert!(matches!(err, JobError::Storage(StorageError::NotFound(_))));
    assert_eq!(storage.keys(), first);

    // Redelivery with the source still present overwrites to the same keys.
    storage.insert("raw/d.mp4", vec![0u8; 64]);
    pipeline.process(uuid, "raw/d.mp4").await.unwrap();
    assert_eq!(storage.keys(), first);
}
