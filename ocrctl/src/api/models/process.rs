use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for the process endpoint
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ProcessRequest {
    /// Locators previously returned by the upload endpoint
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
}

/// Response for a successful processing run
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessResponse {
    pub message: String,
    /// Locator of the generated CSV table, to pass to the download endpoint
    #[schema(example = "s3://my-scans/outputs/output_5a0d2f3e-8c41-4d7b-b7a9-6e2c1f9d0b44.csv")]
    pub csv_url: String,
}
