//! In-memory fakes for the external collaborators, plus helpers to stand up a test server.

use crate::config::{Config, OcrConfig, StorageConfig};
use crate::ocr::{OcrEngine, OcrError};
use crate::storage::{Locator, ObjectStorage, StorageError};
use crate::{AppState, build_router};
use async_trait::async_trait;
use axum_test::TestServer;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const MEMORY_SCHEME: &str = "mem";

/// Object storage held in a map, keyed by object key.
pub struct MemoryObjectStorage {
    bucket: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStorage {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Keys of every stored object, sorted
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.keys().into_iter().filter(|k| k.starts_with(prefix)).collect()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    fn scheme(&self) -> &'static str {
        MEMORY_SCHEME
    }

    async fn put(&self, key: &str, content: Vec<u8>, _content_type: &str) -> crate::storage::Result<Locator> {
        self.objects.lock().unwrap().insert(key.to_string(), content);
        Ok(Locator::new(MEMORY_SCHEME, &self.bucket, key))
    }

    async fn get(&self, locator: &str) -> crate::storage::Result<Vec<u8>> {
        let parsed = Locator::parse(locator, MEMORY_SCHEME)?;
        if parsed.bucket != self.bucket {
            return Err(StorageError::NotFound {
                locator: locator.to_string(),
            });
        }
        self.object(&parsed.key).ok_or_else(|| StorageError::NotFound {
            locator: locator.to_string(),
        })
    }
}

/// OCR engine answering from a table of image bytes to results.
///
/// Images without a scripted answer fail with a transport-style error.
#[derive(Default)]
pub struct ScriptedOcrEngine {
    responses: HashMap<Vec<u8>, Result<String, String>>,
    calls: AtomicUsize,
}

impl ScriptedOcrEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, image: impl AsRef<[u8]>, text: &str) -> Self {
        self.responses.insert(image.as_ref().to_vec(), Ok(text.to_string()));
        self
    }

    pub fn with_error(mut self, image: impl AsRef<[u8]>, message: &str) -> Self {
        self.responses.insert(image.as_ref().to_vec(), Err(message.to_string()));
        self
    }

    /// Number of `detect_text` calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcrEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn detect_text(&self, image: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(image) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(OcrError::Service { message: message.clone() }),
            None => Err(OcrError::Other(anyhow::anyhow!("no scripted OCR response for image"))),
        }
    }
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        bucket: "test-bucket".to_string(),
        storage: StorageConfig::Local {
            path: std::env::temp_dir().join(format!("ocrctl-test-{}", std::process::id())),
        },
        ocr: OcrConfig::Textract { region: None },
        enable_metrics: false,
        ..Default::default()
    }
}

/// Handles to the fakes behind a test server, for asserting on side effects
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<MemoryObjectStorage>,
    pub ocr: Arc<ScriptedOcrEngine>,
}

pub fn create_test_app(ocr: ScriptedOcrEngine) -> TestApp {
    create_test_app_with_config(create_test_config(), ocr)
}

pub fn create_test_app_with_config(config: Config, ocr: ScriptedOcrEngine) -> TestApp {
    let storage = Arc::new(MemoryObjectStorage::new(&config.bucket));
    let ocr = Arc::new(ocr);

    let state = AppState::builder()
        .config(config)
        .storage(storage.clone() as Arc<dyn ObjectStorage>)
        .ocr(ocr.clone() as Arc<dyn OcrEngine>)
        .build();

    let router = build_router(&state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp { server, storage, ocr }
}
