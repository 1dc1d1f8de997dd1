use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Request-level failures. The display text is what the client sees.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to decode image.")]
    Decode(#[source] image::ImageError),

    #[error("No file uploaded.")]
    MissingFile,

    #[error("Invalid upload: {0}")]
    Rejection(#[from] MultipartRejection),

    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Internal server error. Please check the logs.")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Decode(_) | ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::Rejection(rejection) => rejection.status(),
            ApiError::Multipart(err) => err.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Decode(_) => "decode",
            ApiError::MissingFile | ApiError::Rejection(_) | ApiError::Multipart(_) => "upload",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Decode(e) => {
                tracing::error!(error = %e, "Failed to decode image from uploaded file.");
            }
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "An error occurred during processing");
            }
            other => {
                tracing::warn!(error = %other, "Rejected upload");
            }
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
