//! Attachment object storage (S3)

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Attachment storage failed: {0}")]
pub struct StorageError(pub String);

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store the object and return the URL it is served from
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str)
    -> Result<String, StorageError>;
}

pub struct S3AttachmentStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3AttachmentStore {
    pub fn new(client: S3Client, bucket: &str, public_base_url: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AttachmentStore for S3AttachmentStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        // Keys are content-addressed, so re-uploading the same file is a no-op overwrite
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(data.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError(e.to_string()))?;
        Ok(format!("{}/{key}", self.public_base_url))
    }
}
