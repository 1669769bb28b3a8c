//! Error types for establishing the document store connection

use thiserror::Error;

/// Result type alias for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Errors raised while connecting to the document store
///
/// These are fatal at startup: the process cannot serve requests without a
/// connection and does not retry.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No connection string was configured
    #[error("Document store connection string is missing")]
    MissingConnectionString,

    /// The connection string could not be parsed into client options
    #[error("Invalid document store connection string: {0}")]
    InvalidConnectionString(#[source] mongodb::error::Error),

    /// The store did not answer the initial ping
    #[error("Document store is unreachable: {0}")]
    Unreachable(#[source] mongodb::error::Error),
}
