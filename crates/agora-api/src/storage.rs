//! Object stores behind the upload bridge.
//!
//! A store takes an already-generated key plus the payload and answers with
//! the public URL the object can be fetched from. Nothing about the URL is
//! checked afterwards; posts and stories keep it verbatim.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

/// Longest slice of the client's filename kept in a key.
const MAX_NAME_LEN: usize = 48;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("s3 error: {0}")]
    S3(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key` and returns its public URL.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        field_name: &str,
    ) -> Result<String, StorageError>;
}

/// Builds a storage key: millisecond timestamp, a random component and the
/// sanitized original filename. The random part keeps two uploads of the
/// same name in the same millisecond apart.
pub fn object_key(original_name: &str) -> String {
    let mut name: String = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.len() > MAX_NAME_LEN {
        // keep the tail so the extension survives
        name = name[name.len() - MAX_NAME_LEN..].to_string();
    }
    let name = name.trim_start_matches('.');
    let name = if name.is_empty() { "upload" } else { name };

    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &random[..12],
        name
    )
}

/// Writes objects into a local directory that the server also exposes
/// under `public_base`.
pub struct DiskStore {
    dir: PathBuf,
    public_base: String,
}

impl DiskStore {
    pub async fn new(dir: PathBuf, public_base: impl Into<String>) -> Result<Self, StorageError> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self {
            dir,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl ObjectStore for DiskStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
        _field_name: &str,
    ) -> Result<String, StorageError> {
        let path = self.dir.join(key);
        let mut file = fs::File::create(&path).await?;
        file.write_all(&body).await?;
        file.flush().await?;

        debug!("Stored {} bytes at {}", body.len(), path.display());
        Ok(format!("{}/{}", self.public_base, key))
    }
}

/// Where and as whom [`S3Store`] writes.
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Non-AWS endpoint such as MinIO; requests go path-style when set.
    pub endpoint: Option<String>,
    /// Prefix of the URLs handed back to clients.
    pub public_base: String,
}

/// Signed `PutObject` uploads into one bucket.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3Store {
    pub fn new(settings: S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id,
            settings.secret_access_key,
            None,
            None,
            "agora-env",
        );
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::standard().with_max_attempts(2))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(30))
                    .build(),
            )
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
        if let Some(endpoint) = settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!("Uploading to S3 bucket {}", settings.bucket);
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: settings.bucket,
            public_base: settings.public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        field_name: &str,
    ) -> Result<String, StorageError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .metadata("fieldname", field_name)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::S3(DisplayErrorContext(&e).to_string()))?;

        debug!("Stored {} bytes at s3://{}/{}", size, self.bucket, key);
        Ok(format!("{}/{}", self.public_base, key))
    }
}
