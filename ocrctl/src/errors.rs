use crate::ocr::OcrError;
use crate::storage::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Missing or invalid request input (images, locators, or the download parameter)
    #[error("{message}")]
    BadRequest { message: String },

    /// Object storage read or write failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The OCR service failed to process an image
    #[error(transparent)]
    Ocr(#[from] OcrError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Storage(_) | Error::Ocr(_) | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::Storage(storage_err) => match storage_err {
                StorageError::NotFound { locator } => format!("Object not found: {locator}"),
                StorageError::InvalidLocator { locator, reason } => format!("Invalid locator '{locator}': {reason}"),
                StorageError::Io(_) | StorageError::Other(_) => "Storage backend error".to_string(),
            },
            // The service's own message is what callers need to diagnose a rejected image
            Error::Ocr(OcrError::Service { message }) => message.clone(),
            Error::Ocr(OcrError::Other(_)) => "OCR service request failed".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Internal { .. } | Error::Storage(StorageError::Io(_) | StorageError::Other(_)) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Storage(_) => {
                tracing::warn!("Storage error: {}", self);
            }
            Error::Ocr(_) => {
                tracing::warn!("OCR error: {:#}", self);
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = ErrorBody { error: self.user_message() };
        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
