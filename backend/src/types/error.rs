//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use post_storage::post::PostStorageError;
use schemars::JsonSchema;
use serde::Serialize;

use crate::upload_binder::UploadError;

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody { code, message: msg },
            },
        }
    }

    /// HTTP status the error is rendered with
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error.code
    }

    /// Generic error for requests that hit an unknown post
    #[must_use]
    pub const fn post_not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "Post not found",
            false,
        )
    }
}

impl IntoResponse for AppError {
    #[allow(clippy::cognitive_complexity)]
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert storage errors to application errors
impl From<PostStorageError> for AppError {
    #[allow(clippy::cognitive_complexity)]
    fn from(err: PostStorageError) -> Self {
        match &err {
            PostStorageError::InvalidIdentifier(id) => {
                tracing::debug!("Rejected malformed post id: {id}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "Post id must be a 24-character hex string",
                    false,
                )
            }
            PostStorageError::InvalidDocument(reason) => {
                tracing::debug!("Rejected unstorable post document: {reason}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_document",
                    "Post contains a field name or value that cannot be stored",
                    false,
                )
            }
            PostStorageError::Timeout(elapsed) => {
                tracing::error!("Document store timed out after {elapsed:?}");
                Self::new(
                    StatusCode::GATEWAY_TIMEOUT,
                    "store_timeout",
                    "Document store did not respond in time",
                    true,
                )
            }
            PostStorageError::Connection(_)
            | PostStorageError::Database(_)
            | PostStorageError::Serialization(_) => {
                tracing::error!("Document store error: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    true,
                )
            }
        }
    }
}

/// Convert upload errors to application errors
impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingFile => Self::new(
                StatusCode::BAD_REQUEST,
                "missing_file",
                "No image file was attached",
                false,
            ),
            UploadError::TooLarge => Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "Uploaded file exceeds the size limit",
                false,
            ),
            UploadError::InvalidUpload(msg) => {
                tracing::warn!("Malformed upload: {msg}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_upload",
                    "Malformed multipart upload",
                    false,
                )
            }
            UploadError::Io(e) => {
                tracing::error!("Upload I/O error: {e}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    true,
                )
            }
            UploadError::Storage(e) => e.into(),
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
