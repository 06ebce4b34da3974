use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for a successful upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    /// One locator per uploaded image, in upload order
    #[schema(example = json!(["s3://my-scans/images/0b9e1a6c-5f1e-4a57-9c1e-2d4f0a7d8e11_receipt.png"]))]
    pub image_urls: Vec<String>,
}
