use crate::domain::ClipStorage;
use crate::errors::StorageError;
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{Client as S3Client, error::SdkError, primitives::ByteStream};
use uuid::Uuid;

/// Object key for a clip payload. The flat `sounds/` namespace is what
/// makes clip tokens a system-wide uniqueness domain rather than a
/// per-board one.
pub fn sound_key(unique_id: &str) -> String {
    format!("sounds/{unique_id}")
}

/// Object key for a board's cover image.
pub fn cover_key(board_id: Uuid) -> String {
    format!("covers/{board_id}")
}

#[derive(Debug, Clone)]
pub struct S3ClipStorage {
    client: S3Client,
    bucket_name: String,
}

impl S3ClipStorage {
    pub fn new(client: S3Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }
}

#[async_trait]
impl ClipStorage for S3ClipStorage {
    /// Conditional PutObject (`If-None-Match: *`): the write is rejected by
    /// S3 if the key already exists, which is how a clip-token collision
    /// surfaces as a persistence failure instead of silently overwriting
    /// someone else's clip.
    async fn upload_new(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, "S3: Uploading new object");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .if_none_match("*")
            .send()
            .await
            .map_err(|sdk_err| {
                if let SdkError::ServiceError(service_err) = &sdk_err
                    && service_err.err().meta().code() == Some("PreconditionFailed")
                {
                    tracing::warn!(s3_key = %key, bucket = %self.bucket_name, "S3: Key already taken");
                    return StorageError::AlreadyExists(key.to_string());
                }
                tracing::error!(s3_key = %key, bucket = %self.bucket_name, error = %sdk_err, "S3: Error uploading object");
                StorageError::BackendError(
                    anyhow::Error::new(sdk_err)
                        .context(format!("S3: Failed to upload object with key '{}'", key)),
                )
            })?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Upload successful");
        Ok(())
    }

    /// Unconditional PutObject, used when the key is supposed to exist
    /// already (clip replacements, cover images).
    async fn overwrite(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, "S3: Overwriting object");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .context(format!("S3: Failed to overwrite object with key '{}'", key))
            .map_err(StorageError::BackendError)?;

        Ok(())
    }

    /// GetObject, collected into memory. Clips are capped at 15MB so this
    /// stays bounded.
    async fn download(&self, key: &str) -> Result<(Vec<u8>, Option<String>), StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Downloading object");

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|sdk_err| {
                if let SdkError::ServiceError(service_err) = &sdk_err
                    && service_err.err().meta().code() == Some("NoSuchKey")
                {
                    tracing::warn!(s3_key = %key, bucket = %self.bucket_name, "S3: NoSuchKey downloading object");
                    return StorageError::NotFound(key.to_string());
                }
                tracing::error!(s3_key = %key, bucket = %self.bucket_name, error = %sdk_err, "S3: Error downloading object");
                StorageError::BackendError(
                    anyhow::Error::new(sdk_err)
                        .context(format!("S3: Failed to download object with key '{}'", key)),
                )
            })?;

        let content_type = output.content_type().map(|s| s.to_string());
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| {
                StorageError::BackendError(
                    anyhow::Error::new(e)
                        .context(format!("S3: Failed to collect bytes for key '{}'", key)),
                )
            })?
            .into_bytes()
            .to_vec();

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, ?content_type, "S3: Download successful");
        Ok((data, content_type))
    }

    /// DeleteObject. S3 reports success even when the key is absent, which
    /// matches the trait contract.
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Deleting object");

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .context(format!("S3: Failed to delete object with key '{}'", key))
            .map_err(StorageError::BackendError)?;

        Ok(())
    }
}
