use super::{Locator, ObjectStorage, Result, StorageError};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;

pub const SCHEME: &str = "s3";

/// AWS S3 storage backend.
///
/// Credentials come from the standard AWS provider chain (environment, profile, instance
/// metadata). Setting an `endpoint_url` points the client at an S3-compatible service such as
/// MinIO, which usually also needs path-style addressing.
pub struct S3ObjectStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Build a client from the ambient AWS configuration plus optional overrides
    pub async fn from_env(bucket: String, region: Option<String>, endpoint_url: Option<String>, force_path_style: bool) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(force_path_style);
        if let Some(endpoint_url) = endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        Self::new(aws_sdk_s3::Client::from_conf(builder.build()), bucket)
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    async fn put(&self, key: &str, content: Vec<u8>, content_type: &str) -> Result<Locator> {
        let size = content.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| StorageError::Other(anyhow::anyhow!("Failed to upload s3://{}/{}: {}", self.bucket, key, e)))?;

        let locator = Locator::new(SCHEME, &self.bucket, key);
        tracing::debug!(%locator, bytes = size, "Stored object in S3");
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        // Any bucket is accepted; the credentials decide what is readable
        let parsed = Locator::parse(locator, SCHEME)?;

        let output = self
            .client
            .get_object()
            .bucket(&parsed.bucket)
            .key(&parsed.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound {
                        locator: locator.to_string(),
                    }
                } else {
                    StorageError::Other(anyhow::anyhow!("Failed to download {}: {}", locator, e))
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Other(anyhow::anyhow!("Failed to read body of {}: {}", locator, e)))?;

        Ok(body.into_bytes().to_vec())
    }
}
