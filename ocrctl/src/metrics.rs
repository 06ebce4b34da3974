//! Pipeline metrics, recorded through the `metrics` facade.
//!
//! When `enable_metrics` is on, the `axum-prometheus` layer installs the global recorder and these
//! series show up at `/internal/metrics` next to the HTTP request metrics. Otherwise every call
//! here is a no-op.

use std::time::Duration;

pub fn record_images_uploaded(count: usize) {
    metrics::counter!("ocrctl_images_uploaded_total").increment(count as u64);
}

/// Record one OCR call and how long the service took to answer
pub fn record_ocr_request(engine: &'static str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "error" };
    metrics::counter!("ocrctl_ocr_requests_total", "engine" => engine, "outcome" => outcome).increment(1);
    metrics::histogram!("ocrctl_ocr_duration_seconds", "engine" => engine).record(elapsed.as_secs_f64());
}

pub fn record_table_written() {
    metrics::counter!("ocrctl_tables_written_total").increment(1);
}
