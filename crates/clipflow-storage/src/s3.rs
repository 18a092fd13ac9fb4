//! aws-sdk-s3 storage backend for MinIO and other S3-compatible providers.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use clipflow_core::S3Settings;

use crate::traits::{Storage, StorageError, StorageResult};
use crate::VIDEO_FILES_PREFIX;

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Build a client against the configured endpoint. Path-style
    /// addressing is forced because MinIO does not serve virtual-hosted
    /// buckets out of the box.
    pub async fn new(settings: &S3Settings) -> StorageResult<Self> {
        if settings.bucket.is_empty() {
            return Err(StorageError::ConfigError("bucket name is empty".to_string()));
        }

        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "clipflow",
        );
        let base = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        let config = aws_sdk_s3::config::Builder::from(&base)
            .endpoint_url(settings.endpoint_url())
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(config),
            bucket: settings.bucket.clone(),
        })
    }

    /// Ensure the bucket exists, the HLS prefix marker is present, and the
    /// bucket policy grants public read under `video_files/*`. Failures are
    /// logged and tolerated: the environment may already satisfy the
    /// contract, or the operator may manage policy out of band.
    pub async fn bootstrap(&self) {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => tracing::debug!(bucket = %self.bucket, "Bucket already exists"),
            Err(_) => match self.client.create_bucket().bucket(&self.bucket).send().await {
                Ok(_) => tracing::info!(bucket = %self.bucket, "Created bucket"),
                Err(e) => {
                    tracing::warn!(bucket = %self.bucket, error = %e, "Failed to create bucket")
                }
            },
        }

        let marker = format!("{}/", VIDEO_FILES_PREFIX);
        if let Err(e) = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&marker)
            .body(ByteStream::from_static(b""))
            .send()
            .await
        {
            tracing::warn!(bucket = %self.bucket, key = %marker, error = %e, "Failed to create prefix marker");
        }

        let policy = serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": "*",
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{}/{}/*", self.bucket, VIDEO_FILES_PREFIX),
            }]
        });
        match self
            .client
            .put_bucket_policy()
            .bucket(&self.bucket)
            .policy(policy.to_string())
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, prefix = VIDEO_FILES_PREFIX, "Public-read bucket policy set")
            }
            Err(e) => tracing::warn!(bucket = %self.bucket, error = %e, "Failed to set bucket policy"),
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn download_to_file(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let start = Instant::now();

        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::DownloadFailed(service_error.to_string())
                }
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes();
        let size = data.len() as u64;

        tokio::fs::write(dest, &data)
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("write to {:?}: {}", dest, e)))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );
        Ok(size)
    }

    async fn upload_file(&self, key: &str, path: &Path, content_type: &str) -> StorageResult<()> {
        let start = Instant::now();

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("read {:?}: {}", path, e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            content_type = %content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = Instant::now();

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::BackendError(service_error.to_string()))
                }
            }
        }
    }
}
