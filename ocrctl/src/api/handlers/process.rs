use crate::AppState;
use crate::api::models::process::{ProcessRequest, ProcessResponse};
use crate::errors::{Error, ErrorBody, Result};
use crate::extraction::{extract_all, to_csv};
use crate::storage::OUTPUTS_PREFIX;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/process",
    tag = "tables",
    summary = "Extract text from images",
    description = "Run OCR over each stored image, in order, and store a CSV table with one `image_url,extracted_text` row per image. \
                   Any failure aborts the whole request and no table is written.",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Processing complete", body = ProcessResponse),
        (status = 400, description = "No image URLs provided, or the body is not valid JSON", body = ErrorBody),
        (status = 500, description = "Object storage or OCR failure", body = ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn process_images(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>> {
    let Json(request) = payload.map_err(|rejection| Error::BadRequest {
        message: rejection.body_text(),
    })?;

    let image_urls = request.image_urls.unwrap_or_default();
    if image_urls.is_empty() || image_urls.iter().any(|url| url.trim().is_empty()) {
        return Err(Error::bad_request("No image URLs provided"));
    }

    tracing::info!(
        images = image_urls.len(),
        concurrency = state.config.process.concurrency,
        engine = state.ocr.name(),
        "Processing images"
    );

    let records = extract_all(
        state.storage.as_ref(),
        state.ocr.as_ref(),
        &image_urls,
        state.config.process.concurrency,
    )
    .await?;

    let table = to_csv(&records)?;
    let key = format!("{OUTPUTS_PREFIX}output_{}.csv", Uuid::new_v4());
    let locator = state.storage.put(&key, table, "text/csv").await?;

    crate::metrics::record_table_written();
    tracing::info!(%locator, rows = records.len(), "Stored result table");

    Ok(Json(ProcessResponse {
        message: "Processing complete".to_string(),
        csv_url: locator.to_string(),
    }))
}
