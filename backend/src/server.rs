use std::{sync::Arc, time::Duration};

use aide::openapi::OpenApi;
use axum::{extract::DefaultBodyLimit, Extension, Router};
use post_storage::post::PostRepository;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::routes;
use crate::{types::Environment, upload_binder::UploadBinder};

/// Upper bound on a whole request, including the upload body
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the application router with every dependency attached
///
/// Split from [`start`] so tests can drive the router without a listener.
#[must_use]
pub fn build_router(
    environment: Environment,
    posts: Arc<dyn PostRepository>,
    upload_binder: Arc<UploadBinder>,
) -> Router {
    let mut openapi = OpenApi::default();
    let max_upload_bytes = environment.max_upload_bytes();

    routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(Arc::new(openapi)))
        .layer(Extension(environment))
        .layer(Extension(posts))
        .layer(Extension(upload_binder))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    posts: Arc<dyn PostRepository>,
    upload_binder: Arc<UploadBinder>,
) -> anyhow::Result<()> {
    let router = build_router(environment, posts, upload_binder);

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(3000), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Instabytes Backend started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
