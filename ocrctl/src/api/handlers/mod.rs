//! HTTP request handlers for all API endpoints.
//!
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Calling the injected storage and OCR clients from [`crate::AppState`]
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`upload`]: Multipart image upload into object storage
//! - [`process`]: OCR over stored images and result table generation
//! - [`download`]: Streaming a stored object back as a file attachment
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to a `{"error": ...}` JSON body with a
//! 400 status for invalid input and 500 for storage or OCR failures.

pub mod download;
pub mod process;
pub mod upload;
