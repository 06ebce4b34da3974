//! OCR engine interface.
//!
//! An engine takes the raw bytes of one image and returns its full extracted text. Text
//! recognition itself always happens in a remote service; engines here only speak that
//! service's API.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod textract;
pub mod vision;

pub use textract::TextractOcrEngine;
pub use vision::VisionOcrEngine;

#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR service answered, but reported that it could not process the image
    #[error("{message}")]
    Service { message: String },

    /// Transport, decoding, or client setup failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A remote full-text detection service.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name used in logs and metric labels
    fn name(&self) -> &'static str;

    /// Detect all text in one image. Returns an empty string when the image has no text.
    async fn detect_text(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Create the OCR engine selected in configuration
pub async fn create_ocr_engine(config: &crate::config::OcrConfig) -> anyhow::Result<Arc<dyn OcrEngine>> {
    match config {
        crate::config::OcrConfig::Vision {
            api_key,
            endpoint,
            timeout,
        } => {
            let api_key = api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Vision OCR engine requires ocr.api_key"))?;
            tracing::info!(%endpoint, "Creating Google Cloud Vision OCR engine");
            Ok(Arc::new(VisionOcrEngine::new(endpoint.clone(), api_key, *timeout)?))
        }
        crate::config::OcrConfig::Textract { region } => {
            tracing::info!(region = ?region, "Creating AWS Textract OCR engine");
            Ok(Arc::new(TextractOcrEngine::from_env(region.clone()).await))
        }
    }
}
