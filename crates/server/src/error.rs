use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use splitbill_core::BillError;
use splitbill_ocr::ScanError;
use thiserror::Error;
use tracing::warn;

/// Everything a handler can fail with. Only a crashed image-processing task
/// is the server's fault.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Input(String),
    #[error("No image provided")]
    MissingImage,
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Bill(#[from] BillError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Scan(ScanError::Task(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        warn!(status = status.as_u16(), "request rejected: {message}");
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Input(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Input(format!("Expected multipart upload: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Input(format!("Failed to read upload: {}", e.body_text()))
    }
}
