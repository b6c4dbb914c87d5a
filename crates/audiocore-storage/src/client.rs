//! S3-compatible client wrapper used as the service's object storage gateway.

use std::time::Duration;

use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::retry::with_retry;

/// Multipart uploads use 5 MiB parts, S3's minimum non-final part size.
pub const MULTIPART_PART_SIZE: usize = 5 * 1024 * 1024;

/// Maximum number of part uploads a caller should keep in flight at once
/// for a single multipart upload.
pub const MULTIPART_MAX_INFLIGHT: usize = 4;

/// A single completed part of a multipart upload, returned by
/// [`StorageGateway::upload_part`] for the caller to record.
pub type CompletedPart = aws_sdk_s3::types::CompletedPart;

/// Metadata returned by a `head` probe.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Size of the object in bytes.
    pub size_bytes: u64,
    /// Declared content type, if the object carries one.
    pub content_type: Option<String>,
    /// Entity tag, used for conditional requests and `Download`'s `ETag` header.
    pub etag: Option<String>,
    /// Last-modified timestamp, used for `Download`'s `Last-Modified` header.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// Summary entry returned from a prefix listing.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    /// Full object key.
    pub key: String,
    /// Size of the object in bytes.
    pub size_bytes: u64,
}

/// A handle to an in-progress multipart upload.
pub struct MultipartUpload {
    key: String,
    upload_id: String,
    parts: Vec<aws_sdk_s3::types::CompletedPart>,
}

impl MultipartUpload {
    /// Object key this multipart upload targets.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Upload id assigned by the object store for this multipart upload.
    #[must_use]
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Record a part uploaded via a detached [`StorageGateway::upload_part`]
    /// call. Parts may be recorded out of order; [`StorageGateway::complete_multipart_upload`]
    /// sorts them by part number before submitting.
    pub fn record_part(&mut self, part: aws_sdk_s3::types::CompletedPart) {
        self.parts.push(part);
    }
}

/// Gateway over an S3-compatible object store, used to persist and serve
/// converted audio artifacts.
#[derive(Clone)]
pub struct StorageGateway {
    client: Client,
    bucket: String,
}

impl StorageGateway {
    /// Build a gateway from an already-configured SDK client.
    #[must_use]
    pub const fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Load SDK defaults (region, credentials chain) and optionally point the
    /// client at a custom endpoint, for use against S3-compatible services
    /// during local development and integration tests.
    pub async fn from_env(bucket: String, region: String, endpoint: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(aws_sdk_s3::config::Region::new(region));
        if let Some(endpoint) = endpoint.clone() {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if endpoint.is_some() {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }
        let client = Client::from_conf(s3_config_builder.build());
        Self::new(client, bucket)
    }

    /// Probe whether an object exists and return its size and content type.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the object is absent, or
    /// [`StorageError::Download`] for other head failures.
    #[instrument(skip(self))]
    pub async fn head(&self, key: &str) -> Result<ObjectMeta> {
        with_retry(
            "head_object",
            is_retryable_sdk_error,
            || async {
                let output = self
                    .client
                    .head_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|err| classify_head_error(key, err))?;
                Ok(ObjectMeta {
                    size_bytes: u64::try_from(output.content_length().unwrap_or_default()).unwrap_or_default(),
                    content_type: output.content_type().map(str::to_string),
                    etag: output.e_tag().map(str::to_string),
                    last_modified: output.last_modified().and_then(|dt| chrono::DateTime::from_timestamp(dt.secs(), 0)),
                })
            },
        )
        .await
    }

    /// Download the full contents of an object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] or [`StorageError::Download`].
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        with_retry(
            "get_object",
            is_retryable_sdk_error,
            || async {
                let output = self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|err| classify_get_error(key, err))?;
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|err| StorageError::Download {
                        key: key.to_string(),
                        source: Box::new(err),
                    })?
                    .into_bytes();
                Ok(bytes)
            },
        )
        .await
    }

    /// Open a lazily-consumed byte stream over an object's contents, for the
    /// streaming data plane and the download streamer. Does not buffer the
    /// whole object in memory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] or [`StorageError::Download`].
    #[instrument(skip(self))]
    pub async fn get_stream(&self, key: &str) -> Result<ByteStream> {
        with_retry(
            "get_object_stream",
            is_retryable_sdk_error,
            || async {
                let output = self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|err| classify_get_error(key, err))?;
                Ok(output.body)
            },
        )
        .await
    }

    /// Upload a small object in a single `PutObject` call.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Upload`] on failure.
    #[instrument(skip(self, body))]
    pub async fn put_small(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        with_retry(
            "put_object",
            is_retryable_sdk_error,
            || async {
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .content_type(content_type)
                    .body(ByteStream::from(body.clone()))
                    .send()
                    .await
                    .map_err(|err| StorageError::Upload {
                        key: key.to_string(),
                        source: Box::new(err),
                    })?;
                Ok(())
            },
        )
        .await
    }

    /// Begin a multipart upload for a large converted artifact.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Upload`] if the upload cannot be initiated.
    #[instrument(skip(self))]
    pub async fn create_multipart_upload(&self, key: &str, content_type: &str) -> Result<MultipartUpload> {
        let output = with_retry(
            "create_multipart_upload",
            is_retryable_sdk_error,
            || async {
                self.client
                    .create_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .content_type(content_type)
                    .send()
                    .await
                    .map_err(|err| StorageError::Upload {
                        key: key.to_string(),
                        source: Box::new(err),
                    })
            },
        )
        .await?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| StorageError::Upload {
                key: key.to_string(),
                source: "multipart upload response did not include an upload id".into(),
            })?
            .to_string();

        Ok(MultipartUpload {
            key: key.to_string(),
            upload_id,
            parts: Vec::new(),
        })
    }

    /// Upload a single part of an in-progress multipart upload.
    ///
    /// Detached from the [`MultipartUpload`] handle so callers can hold up to
    /// [`MULTIPART_MAX_INFLIGHT`] of these futures concurrently; the caller
    /// is responsible for recording the returned part on the upload (via
    /// [`MultipartUpload::record_part`]) and for aborting the upload if any
    /// part ultimately fails.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Upload`] on failure.
    #[instrument(skip(self, body))]
    pub async fn upload_part(&self, key: &str, upload_id: &str, part_number: i32, body: Bytes) -> Result<aws_sdk_s3::types::CompletedPart> {
        with_retry("upload_part", is_retryable_sdk_error, || async {
            self.client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(body.clone()))
                .send()
                .await
                .map(|output| {
                    aws_sdk_s3::types::CompletedPart::builder()
                        .part_number(part_number)
                        .set_e_tag(output.e_tag().map(str::to_string))
                        .build()
                })
                .map_err(|err| StorageError::Upload {
                    key: key.to_string(),
                    source: Box::new(err),
                })
        })
        .await
    }

    /// Complete a multipart upload once every part has been uploaded.
    ///
    /// Parts are sorted by part number before being submitted, since they
    /// may have been recorded out of order by concurrent uploads.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Upload`] on failure, aborting the upload first.
    #[instrument(skip(self, upload))]
    pub async fn complete_multipart_upload(&self, upload: MultipartUpload) -> Result<()> {
        let mut sorted_parts = upload.parts.clone();
        sorted_parts.sort_by_key(aws_sdk_s3::types::CompletedPart::part_number);
        let parts = aws_sdk_s3::types::CompletedMultipartUpload::builder().set_parts(Some(sorted_parts)).build();

        let result = with_retry(
            "complete_multipart_upload",
            is_retryable_sdk_error,
            || async {
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(&upload.key)
                    .upload_id(&upload.upload_id)
                    .multipart_upload(parts.clone())
                    .send()
                    .await
                    .map_err(|err| StorageError::Upload {
                        key: upload.key.clone(),
                        source: Box::new(err),
                    })
            },
        )
        .await;

        if result.is_err() {
            self.abort_multipart_upload(&upload.key, &upload.upload_id).await?;
        }
        result.map(|_| ())
    }

    /// Abort an in-progress multipart upload, releasing any uploaded parts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MultipartAbortFailed`] if the abort call fails.
    #[instrument(skip(self))]
    pub async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        debug!(key, upload_id, "aborting multipart upload");
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|err| StorageError::MultipartAbortFailed {
                key: key.to_string(),
                upload_id: upload_id.to_string(),
                source: Box::new(err),
            })?;
        Ok(())
    }

    /// Generate a time-limited presigned GET URL for an object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Presign`] on failure.
    #[instrument(skip(self))]
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String> {
        let config = PresigningConfig::expires_in(expires_in).map_err(|err| StorageError::Presign {
            key: key.to_string(),
            source: Box::new(err),
        })?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|err| StorageError::Presign {
                key: key.to_string(),
                source: Box::new(err),
            })?;
        Ok(request.uri().to_string())
    }

    /// List objects whose keys start with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] on failure.
    #[instrument(skip(self))]
    pub async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        with_retry(
            "list_objects_v2",
            is_retryable_sdk_error,
            || async {
                let output = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(prefix)
                    .send()
                    .await
                    .map_err(|err| StorageError::List {
                        prefix: prefix.to_string(),
                        source: Box::new(err),
                    })?;
                Ok(output
                    .contents()
                    .iter()
                    .filter_map(|object| {
                        let key = object.key()?.to_string();
                        let size_bytes = u64::try_from(object.size().unwrap_or_default()).unwrap_or_default();
                        Some(ObjectSummary { key, size_bytes })
                    })
                    .collect())
            },
        )
        .await
    }
}

fn classify_head_error<E>(key: &str, err: aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
    aws_sdk_s3::error::SdkError<E>: std::error::Error + Send + Sync + 'static,
{
    if is_not_found(&err) {
        StorageError::NotFound { key: key.to_string() }
    } else {
        StorageError::Download {
            key: key.to_string(),
            source: Box::new(err),
        }
    }
}

fn classify_get_error(key: &str, err: aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>) -> StorageError {
    if is_not_found(&err) {
        StorageError::NotFound { key: key.to_string() }
    } else {
        StorageError::Download {
            key: key.to_string(),
            source: Box::new(err),
        }
    }
}

fn is_not_found<E>(err: &aws_sdk_s3::error::SdkError<E>) -> bool {
    err.raw_response()
        .is_some_and(|response| response.status().as_u16() == 404)
}

fn is_retryable_sdk_error(err: &StorageError) -> bool {
    matches!(
        err,
        StorageError::Download { .. } | StorageError::Upload { .. } | StorageError::List { .. }
    ) && !matches!(err, StorageError::NotFound { .. })
}

impl std::fmt::Debug for MultipartUpload {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MultipartUpload")
            .field("key", &self.key)
            .field("upload_id", &self.upload_id)
            .field("parts", &self.parts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_meta_carries_size_and_content_type() {
        let meta = ObjectMeta {
            size_bytes: 1024,
            content_type: Some("audio/wav".to_string()),
            etag: Some("\"abc123\"".to_string()),
            last_modified: None,
        };
        assert_eq!(meta.size_bytes, 1024);
        assert_eq!(meta.content_type.as_deref(), Some("audio/wav"));
    }

    #[test]
    fn multipart_part_size_is_at_least_the_s3_minimum() {
        assert!(MULTIPART_PART_SIZE >= 5 * 1024 * 1024);
    }
}
