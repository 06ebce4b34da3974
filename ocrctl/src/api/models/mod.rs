//! API request and response data models.
//!
//! Field names match the wire format exactly (`image_urls`, `csv_url`), so existing clients of
//! the service keep working.

pub mod download;
pub mod process;
pub mod upload;
