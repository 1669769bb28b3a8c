use aide::axum::IntoApiResponse;
use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;

use crate::types::Environment;

/// Liveness payload
#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthResponse {
    status: &'static str,
    /// Deployment stage the process was started in
    environment: &'static str,
    /// Crate version
    semver: &'static str,
    /// Commit hash of the build, if it was provided at compile time
    rev: Option<&'static str>,
}

/// Reports that the process is serving requests
///
/// Does not round-trip to the document store.
pub async fn handler(Extension(environment): Extension<Environment>) -> impl IntoApiResponse {
    Json(HealthResponse {
        status: "ok",
        environment: environment.name(),
        semver: env!("CARGO_PKG_VERSION"),
        rev: option_env!("GIT_REV"),
    })
}
