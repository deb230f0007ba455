//! API error type and its JSON rendering.

use crate::download::DownloadError;
use crate::media::{user_message, BackendError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

pub const UNEXPECTED_ERROR: &str = "An unexpected server error occurred.";
const FFMPEG_MISSING: &str = "Download failed: FFmpeg utility may be missing or not found on the server. It's required for merging audio/video.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Maps a failed info lookup. Content errors are the caller's problem and
    /// get a translated message; anything else is ours and is only logged.
    pub fn from_info_lookup(url: &str, err: BackendError) -> Self {
        if err.is_content_error() {
            warn!("Backend error for {}: {}", url, err);
            Self::bad_request(user_message(&err.to_string()))
        } else {
            error!("Unexpected server error processing URL {}: {}", url, err);
            Self::internal(UNEXPECTED_ERROR)
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        error!("Download failed: {}", err);

        match err {
            DownloadError::FormatNotFound(_) => Self::bad_request(err.to_string()),
            DownloadError::Scratch(_) => {
                Self::internal("Server error: Could not create a temporary directory.")
            }
            DownloadError::Lookup(source) if source.is_content_error() => Self::internal(format!(
                "Download preparation failed: {}",
                user_message(&source.to_string())
            )),
            DownloadError::Lookup(_) => Self::internal("Server download failed unexpectedly."),
            DownloadError::Backend { source, merge } if merge && source.mentions_ffmpeg() => {
                Self::internal(FFMPEG_MISSING)
            }
            DownloadError::Backend { source, .. } => Self::internal(format!(
                "Download failed during server processing: {}",
                source.summary()
            )),
            DownloadError::OutputMissing(_) => Self::internal(
                "Server error: Download seemed to succeed but the output file is missing.",
            ),
            DownloadError::Rename { .. } => {
                Self::internal("Server error: Failed to prepare file after download.")
            }
            DownloadError::Open(_) => {
                Self::internal("Server error: Final file path lost before sending.")
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
