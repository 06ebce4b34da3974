//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for the upload, process, and download endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! A caller drives the pipeline by chaining the three calls itself: the locators returned by
//! `POST /upload` go into `POST /process`, and the table locator it returns goes into
//! `GET /download`. Nothing links the calls on the server side.

pub mod handlers;
pub mod models;
