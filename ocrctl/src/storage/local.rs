use super::{Locator, ObjectStorage, Result, StorageError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const SCHEME: &str = "local";

/// Local filesystem storage backend - objects live at `{base_path}/{bucket}/{key}`.
/// Useful for development and testing
pub struct LocalObjectStorage {
    base_path: PathBuf,
    bucket: String,
}

impl LocalObjectStorage {
    pub fn new(base_path: PathBuf, bucket: String) -> Self {
        Self { base_path, bucket }
    }

    /// Map a bucket/key pair onto disk, refusing anything that could escape the base directory
    fn object_path(&self, raw: &str, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::InvalidLocator {
                locator: raw.to_string(),
                reason: "path traversal is not allowed".to_string(),
            });
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    async fn put(&self, key: &str, content: Vec<u8>, _content_type: &str) -> Result<Locator> {
        let locator = Locator::new(SCHEME, &self.bucket, key);
        let full_path = self.object_path(&locator.to_string(), &self.bucket, key)?;

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;

        tracing::debug!(%locator, bytes = content.len(), "Stored object on local disk");
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let parsed = Locator::parse(locator, SCHEME)?;
        let full_path = self.object_path(locator, &parsed.bucket, &parsed.key)?;

        match fs::read(&full_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                locator: locator.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
