use super::{Locator, ObjectStorage, Result, StorageError};
use async_trait::async_trait;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;

pub const SCHEME: &str = "gs";

/// Google Cloud Storage backend.
///
/// Credentials follow the usual Google lookup: `GOOGLE_APPLICATION_CREDENTIALS` or
/// `GOOGLE_SERVICE_ACCOUNT_PATH`, an explicit `service_account_path`, or application default
/// credentials on GCE/GKE. Only objects in the configured bucket are readable.
pub struct GcsObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl GcsObjectStorage {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String) -> Self {
        Self { store, bucket }
    }

    /// Build a client for `bucket` from the environment plus an optional service account file
    pub fn from_env(bucket: String, service_account_path: Option<String>) -> Result<Self> {
        let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(&bucket);
        if let Some(path) = service_account_path {
            builder = builder.with_service_account_path(path);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Other(anyhow::anyhow!("Failed to create GCS client for bucket '{bucket}': {e}")))?;

        Ok(Self::new(Arc::new(store), bucket))
    }

    fn object_path(raw: &str, key: &str) -> Result<Path> {
        Path::parse(key).map_err(|e| StorageError::InvalidLocator {
            locator: raw.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStorage for GcsObjectStorage {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    async fn put(&self, key: &str, content: Vec<u8>, content_type: &str) -> Result<Locator> {
        let locator = Locator::new(SCHEME, &self.bucket, key);
        let path = Self::object_path(&locator.to_string(), key)?;
        let size = content.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&path, PutPayload::from(content), options)
            .await
            .map_err(|e| StorageError::Other(anyhow::anyhow!("Failed to upload {locator}: {e}")))?;

        tracing::debug!(%locator, bytes = size, "Stored object in GCS");
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let parsed = Locator::parse(locator, SCHEME)?;
        if parsed.bucket != self.bucket {
            return Err(StorageError::InvalidLocator {
                locator: locator.to_string(),
                reason: format!("bucket '{}' is not served by this backend", parsed.bucket),
            });
        }
        let path = Self::object_path(locator, &parsed.key)?;

        let not_found_or_other = |e: object_store::Error| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound {
                locator: locator.to_string(),
            },
            other => StorageError::Other(anyhow::anyhow!("Failed to download {locator}: {other}")),
        };

        let result = self.store.get(&path).await.map_err(not_found_or_other)?;
        let body = result.bytes().await.map_err(not_found_or_other)?;

        Ok(body.to_vec())
    }
}
