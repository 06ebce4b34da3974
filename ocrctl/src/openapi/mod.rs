//! OpenAPI documentation for the image and table endpoints.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::errors::ErrorBody;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ocrctl",
        description = "Upload images to object storage, extract their text with OCR into a CSV table, and download the table."
    ),
    paths(
        api::handlers::upload::upload_images,
        api::handlers::process::process_images,
        api::handlers::download::download_table,
    ),
    components(
        schemas(
            api::models::upload::UploadResponse,
            api::models::process::ProcessRequest,
            api::models::process::ProcessResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "images", description = "Store images for later text extraction"),
        (name = "tables", description = "Extract text into CSV tables and retrieve them"),
    )
)]
pub struct ApiDoc;
