//! Fan-out of stored images through OCR, and serialization of the result table.

use std::time::Instant;

use futures::{StreamExt, TryStreamExt, stream};

use crate::errors::{Error, Result};
use crate::ocr::OcrEngine;
use crate::storage::ObjectStorage;

/// Header row of every result table
pub const TABLE_HEADER: [&str; 2] = ["image_url", "extracted_text"];

/// Text extracted from one stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    pub image_url: String,
    pub extracted_text: String,
}

/// Fetch one object and run it through OCR.
#[tracing::instrument(skip(storage, ocr), fields(engine = ocr.name()))]
async fn extract_one(storage: &dyn ObjectStorage, ocr: &dyn OcrEngine, locator: &str) -> Result<ExtractionRecord> {
    let image = storage.get(locator).await?;

    let started = Instant::now();
    let detected = ocr.detect_text(&image).await;
    crate::metrics::record_ocr_request(ocr.name(), detected.is_ok(), started.elapsed());
    let extracted_text = detected?;

    tracing::debug!(bytes = image.len(), chars = extracted_text.len(), "Extracted text from image");

    Ok(ExtractionRecord {
        image_url: locator.to_string(),
        extracted_text,
    })
}

/// Extract text from every locator.
///
/// At most `concurrency` images are in flight at once. Records come back in input order. The
/// first failure drops all outstanding work and is returned; no partial result escapes.
pub async fn extract_all(
    storage: &dyn ObjectStorage,
    ocr: &dyn OcrEngine,
    locators: &[String],
    concurrency: usize,
) -> Result<Vec<ExtractionRecord>> {
    stream::iter(locators.iter().cloned())
        .map(move |locator| async move { extract_one(storage, ocr, &locator).await })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Serialize records as a two-column CSV table with a header row.
pub fn to_csv(records: &[ExtractionRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());

    let write_err = |e: csv::Error| Error::Internal {
        operation: format!("write result table: {e}"),
    };

    writer.write_record(TABLE_HEADER).map_err(write_err)?;
    for record in records {
        writer
            .write_record([record.image_url.as_str(), record.extracted_text.as_str()])
            .map_err(write_err)?;
    }

    writer.into_inner().map_err(|e| Error::Internal {
        operation: format!("flush result table: {e}"),
    })
}
