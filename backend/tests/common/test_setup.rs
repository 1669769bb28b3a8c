use axum::{body::Body, http::Request, response::Response, Router};
use backend::{server, types::Environment, upload_binder::UploadBinder};
use post_storage::{mock::InMemoryPostStore, post::PostRepository};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use super::utils::{multipart_body, multipart_content_type, Part};

/// Base URL images are reported under in tests
pub const TEST_PUBLIC_BASE_URL: &str = "https://cdn.example.com";

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Load test environment variables
    dotenvy::from_path(".env.example").ok();

    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Router wired to an in-memory store and a throwaway upload directory
pub struct TestSetup {
    pub router: Router,
    pub environment: Environment,
    pub store: Arc<InMemoryPostStore>,
    // Keep the upload directory alive for the duration of the test
    upload_dir: TempDir,
}

impl TestSetup {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryPostStore::new());
        Self::with_repository(store.clone(), store)
    }

    /// Serves `posts`; `store` is only exposed for inspection
    pub fn with_repository(posts: Arc<dyn PostRepository>, store: Arc<InMemoryPostStore>) -> Self {
        setup_test_env();

        let environment = Environment::Development;
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

        let upload_binder = Arc::new(UploadBinder::new(
            posts.clone(),
            upload_dir.path(),
            TEST_PUBLIC_BASE_URL,
        ));

        let router = server::build_router(environment.clone(), posts, upload_binder);

        Self {
            router,
            environment,
            store,
            upload_dir,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        self.upload_dir.path()
    }

    /// Names of every file in the upload directory, spooled ones included
    pub fn uploaded_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.upload_dir.path())
            .expect("Failed to read upload dir")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_raw_request(
        &self,
        method: &str,
        route: &str,
        content_type: Option<&str>,
        body: impl Into<Body>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut builder = Request::builder().uri(route).method(method);
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        let request = builder.body(body.into())?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_multipart_request(
        &self,
        method: &str,
        route: &str,
        parts: &[Part],
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let content_type = multipart_content_type();
        self.send_raw_request(method, route, Some(&content_type), multipart_body(parts))
            .await
    }
}
