//! Error types for upload binding

use post_storage::post::PostStorageError;
use thiserror::Error;

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors that can occur while receiving and binding an upload
#[derive(Error, Debug)]
pub enum UploadError {
    /// No file part (or an empty one) was received
    #[error("No file was received")]
    MissingFile,

    /// The request body exceeded the configured limit
    #[error("Upload exceeds the size limit")]
    TooLarge,

    /// The multipart body could not be read
    #[error("Malformed upload: {0}")]
    InvalidUpload(String),

    /// Writing or moving the file failed
    #[error("Failed to store uploaded file: {0}")]
    Io(#[from] std::io::Error),

    /// The post store rejected or failed the operation
    #[error(transparent)]
    Storage(#[from] PostStorageError),
}
