use crate::AppState;
use crate::api::models::upload::UploadResponse;
use crate::errors::{Error, ErrorBody, Result};
use crate::storage::IMAGES_PREFIX;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};
use uuid::Uuid;

/// Multipart field carrying the images; every part with this name is stored
pub const IMAGES_FIELD: &str = "images";

const FALLBACK_FILENAME: &str = "image";

/// Reduce a client-supplied filename to something safe to embed in an object key.
///
/// Only the final path component survives, and characters outside a conservative set are
/// replaced with `_`.
pub(crate) fn sanitize_filename(raw: Option<&str>) -> String {
    let base = raw
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "images",
    summary = "Upload images",
    description = "Store one or more images sent as repeated `images` multipart parts. Returns one locator per image, in upload order.",
    request_body(
        content_type = "multipart/form-data",
        description = "One or more `images` file parts"
    ),
    responses(
        (status = 200, description = "Images uploaded successfully", body = UploadResponse),
        (status = 400, description = "No images provided, or the form could not be parsed", body = ErrorBody),
        (status = 500, description = "Object storage failure", body = ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_images(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| Error::BadRequest {
        message: rejection.body_text(),
    })?;
    let mut image_urls = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        let message = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            format!(
                "Upload exceeds the maximum size of {} bytes",
                state.config.limits.max_upload_bytes
            )
        } else {
            format!("Failed to parse multipart data: {e}")
        };
        Error::BadRequest { message }
    })? {
        if field.name() != Some(IMAGES_FIELD) {
            tracing::debug!(field = ?field.name(), "Skipping unrelated multipart field");
            continue;
        }
        // Only file attachments count as images; a plain form value named `images` does not
        if field.file_name().is_none() {
            tracing::debug!("Skipping `images` part without a filename");
            continue;
        }

        let filename = sanitize_filename(field.file_name());
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime_guess::from_path(&filename).first_or_octet_stream().to_string());

        let content = field.bytes().await.map_err(|e| Error::BadRequest {
            message: format!("Failed to read image '{filename}': {e}"),
        })?;

        // Each image is written before the next part is read, so a storage failure mid-request
        // leaves the earlier images in place.
        let key = format!("{IMAGES_PREFIX}{}_{}", Uuid::new_v4(), filename);
        let size = content.len();
        let locator = state.storage.put(&key, content.to_vec(), &content_type).await?;

        tracing::info!(%locator, size, %content_type, "Stored uploaded image");
        image_urls.push(locator.to_string());
    }

    if image_urls.is_empty() {
        return Err(Error::bad_request("No images provided"));
    }

    crate::metrics::record_images_uploaded(image_urls.len());

    Ok(Json(UploadResponse {
        message: "Images uploaded successfully".to_string(),
        image_urls,
    }))
}
