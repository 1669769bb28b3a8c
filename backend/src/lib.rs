//! Instabytes posts backend

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// HTTP route handlers
pub mod routes;

/// Server bootstrap
pub mod server;

/// Configuration, errors and extractors
pub mod types;

/// Binding uploaded images to post records
pub mod upload_binder;
