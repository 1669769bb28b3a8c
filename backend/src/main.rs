use std::sync::Arc;

use anyhow::Context;

use backend::{server, types::Environment, upload_binder::UploadBinder};
use post_storage::{
    connection::ConnectionManager,
    post::{PostRepository, PostStore},
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env();

    // Fall back to the environment's level when RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(environment.tracing_level().to_string()));

    // JSON logs for staging/production, human-readable for development
    if environment.json_logs() {
        fmt().json().with_env_filter(env_filter).init();
    } else {
        fmt().with_env_filter(env_filter).init();
    }

    let connection = ConnectionManager::new(
        environment.connection_string(),
        environment.database_name(),
    )?;
    // Fail fast: an unreachable store at startup is fatal
    connection.connect().await?;

    let posts: Arc<dyn PostRepository> = Arc::new(
        PostStore::new(&connection)
            .await?
            .with_operation_timeout(environment.store_operation_timeout()),
    );

    let public_base_url = environment
        .public_base_url()
        .context("PUBLIC_BASE_URL must be set outside development")?;
    let upload_binder = Arc::new(UploadBinder::new(
        posts.clone(),
        environment.upload_dir(),
        public_base_url,
    ));
    upload_binder.ensure_upload_dir().await?;

    let result = server::start(environment, posts, upload_binder).await;

    connection.shutdown().await;

    result
}
