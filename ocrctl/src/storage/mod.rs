//! Object storage backends.
//!
//! Handlers only ever see locator strings of the form `{scheme}://{bucket}/{key}`. Parsing and
//! rejecting malformed locators is the backend's job: a handler checks that a locator is
//! non-empty and passes it through untouched.
//!
//! - [`s3::S3ObjectStorage`]: AWS S3 or any S3-compatible service (`s3://`)
//! - [`gcs::GcsObjectStorage`]: Google Cloud Storage (`gs://`)
//! - [`local::LocalObjectStorage`]: a directory on local disk (`local://`), for development

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub mod gcs;
pub mod local;
pub mod s3;

pub use gcs::GcsObjectStorage;
pub use local::LocalObjectStorage;
pub use s3::S3ObjectStorage;

/// Key prefix for uploaded images
pub const IMAGES_PREFIX: &str = "images/";

/// Key prefix for generated result tables
pub const OUTPUTS_PREFIX: &str = "outputs/";

/// Unified error type for storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// No object exists at the given locator
    #[error("Object not found: {locator}")]
    NotFound { locator: String },

    /// The locator could not be parsed or does not belong to this backend
    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for backend failures (network, permissions, SDK errors)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Type alias for storage operation results
pub type Result<T> = std::result::Result<T, StorageError>;

/// A parsed `{scheme}://{bucket}/{key}` object address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub scheme: String,
    pub bucket: String,
    pub key: String,
}

impl Locator {
    pub fn new(scheme: impl Into<String>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a locator string, requiring the given scheme.
    pub fn parse(raw: &str, expected_scheme: &str) -> Result<Self> {
        let invalid = |reason: &str| StorageError::InvalidLocator {
            locator: raw.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = raw.split_once("://").ok_or_else(|| invalid("expected '<scheme>://<bucket>/<key>'"))?;
        if scheme != expected_scheme {
            return Err(invalid(&format!("expected scheme '{expected_scheme}', got '{scheme}'")));
        }

        let (bucket, key) = rest.split_once('/').ok_or_else(|| invalid("missing object key"))?;
        if bucket.is_empty() {
            return Err(invalid("missing bucket name"));
        }
        if key.is_empty() {
            return Err(invalid("missing object key"));
        }

        Ok(Self::new(scheme, bucket, key))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

/// Trait for object storage backends
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Locator scheme this backend produces and accepts (e.g. `s3`)
    fn scheme(&self) -> &'static str;

    /// Write `content` under `key` in the configured bucket and return its locator
    async fn put(&self, key: &str, content: Vec<u8>, content_type: &str) -> Result<Locator>;

    /// Read the full content of the object at `locator`
    async fn get(&self, locator: &str) -> Result<Vec<u8>>;
}

// ============================================================================
// Factory
// ============================================================================

/// Create an object storage backend based on configuration
pub async fn create_object_storage(config: &crate::Config) -> Result<Arc<dyn ObjectStorage>> {
    match &config.storage {
        crate::config::StorageConfig::S3 {
            region,
            endpoint_url,
            force_path_style,
        } => {
            tracing::info!(bucket = %config.bucket, endpoint_url = ?endpoint_url, "Creating S3 object storage backend");
            let storage = S3ObjectStorage::from_env(config.bucket.clone(), region.clone(), endpoint_url.clone(), *force_path_style).await;
            Ok(Arc::new(storage))
        }
        crate::config::StorageConfig::Gcs { service_account_path } => {
            tracing::info!(bucket = %config.bucket, "Creating GCS object storage backend");
            let storage = GcsObjectStorage::from_env(config.bucket.clone(), service_account_path.clone())?;
            Ok(Arc::new(storage))
        }
        crate::config::StorageConfig::Local { path } => {
            tracing::info!(bucket = %config.bucket, "Creating local object storage backend (path: {:?})", path);
            let bucket_dir = path.join(&config.bucket);
            if let Err(e) = tokio::fs::create_dir_all(&bucket_dir).await {
                return Err(StorageError::Other(anyhow::anyhow!(
                    "Failed to create local storage directory {:?}: {}",
                    bucket_dir,
                    e
                )));
            }
            Ok(Arc::new(LocalObjectStorage::new(path.clone(), config.bucket.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_display() {
        let locator = Locator::parse("s3://scans/images/1234_a.png", "s3").unwrap();
        assert_eq!(locator.bucket, "scans");
        assert_eq!(locator.key, "images/1234_a.png");
        assert_eq!(locator.to_string(), "s3://scans/images/1234_a.png");
    }

    #[test]
    fn test_parse_rejects_malformed_locators() {
        for raw in ["scans/images/a.png", "s3://", "s3://scans", "s3://scans/", "s3:///images/a.png"] {
            let err = Locator::parse(raw, "s3").unwrap_err();
            assert!(matches!(err, StorageError::InvalidLocator { .. }), "{raw} should be invalid");
        }
    }

    #[test]
    fn test_parse_rejects_foreign_scheme() {
        let err = Locator::parse("gs://scans/images/a.png", "s3").unwrap_err();
        match err {
            StorageError::InvalidLocator { reason, .. } => assert!(reason.contains("'gs'")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
