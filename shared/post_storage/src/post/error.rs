//! Error types for post storage operations

use std::time::Duration;

use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

use crate::connection::ConnectionError;

/// Result type alias for storage operations
pub type PostStorageResult<T> = Result<T, PostStorageError>;

/// Server error codes raised for documents that can never be stored as sent
///
/// `BadValue`, `DollarPrefixedFieldName`, `EmptyFieldName`, `DottedFieldName`
/// and `BSONObjectTooLarge`.
const INVALID_DOCUMENT_CODES: [i32; 5] = [2, 52, 56, 57, 10334];

/// Storage error types for post operations
#[derive(Debug, Error)]
pub enum PostStorageError {
    /// Identifier is not a 24-character hex string
    #[error("Invalid post identifier `{0}`: expected a 24-character hex string")]
    InvalidIdentifier(String),

    /// The client payload has no stored form (unsupported value or field name)
    #[error("Invalid post document: {0}")]
    InvalidDocument(String),

    /// Failed to obtain the collection handle
    #[error("Document store connection failed: {0}")]
    Connection(#[from] ConnectionError),

    /// Failed to execute an operation against `MongoDB`
    #[error("Document store operation failed: {0}")]
    Database(#[source] mongodb::error::Error),

    /// Failed to convert a stored document back into a post
    #[error("Failed to convert post document: {0}")]
    Serialization(String),

    /// The store did not answer within the configured bound
    #[error("Document store operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<mongodb::error::Error> for PostStorageError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if is_invalid_document_code(write_error.code) =>
            {
                Self::InvalidDocument(write_error.message.clone())
            }
            _ => Self::Database(err),
        }
    }
}

/// Payload conversion failures are the client's document, not the store
impl From<mongodb::bson::ser::Error> for PostStorageError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}

/// Whether a server write error code means the document itself is rejected
#[must_use]
pub fn is_invalid_document_code(code: i32) -> bool {
    INVALID_DOCUMENT_CODES.contains(&code)
}
