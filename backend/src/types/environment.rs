//! Environment configuration for different deployment stages

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::Level;

/// Default database holding the posts collection
const DEFAULT_DATABASE_NAME: &str = "instabytes";

/// Local `MongoDB` used in development
const DEVELOPMENT_CONNECTION_STRING: &str = "mongodb://localhost:27017";

/// Default upload directory, relative to the working directory
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Base URL uploaded images are served from in development
///
/// This server does not serve the upload directory; a separate static host
/// must expose it under this URL.
const DEVELOPMENT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

/// Default bound on a single document store round trip
const DEFAULT_STORE_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Default maximum request body size for uploads (10 MiB)
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses a local `MongoDB`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Lowercase stage name, as accepted by `APP_ENV`
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
        }
    }

    /// Returns the document store connection string
    ///
    /// Production and staging must set `MONGODB_URI`; a missing value is
    /// reported when the connection is established.
    #[must_use]
    pub fn connection_string(&self) -> Option<String> {
        let configured = env::var("MONGODB_URI").ok();
        match self {
            Self::Production | Self::Staging => configured,
            Self::Development => {
                configured.or_else(|| Some(DEVELOPMENT_CONNECTION_STRING.to_string()))
            }
        }
    }

    /// Returns the database name holding the posts collection
    #[must_use]
    pub fn database_name(&self) -> String {
        env::var("MONGODB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE_NAME.to_string())
    }

    /// Directory uploaded images are written to
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        env::var("UPLOAD_DIR")
            .map_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR), PathBuf::from)
    }

    /// Base URL prefixed to stored image file names
    ///
    /// Production and staging must set `PUBLIC_BASE_URL` to the host that
    /// serves the upload directory; `None` there means it is missing.
    #[must_use]
    pub fn public_base_url(&self) -> Option<String> {
        let configured = env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        match self {
            Self::Production | Self::Staging => configured,
            Self::Development => {
                configured.or_else(|| Some(DEVELOPMENT_PUBLIC_BASE_URL.to_string()))
            }
        }
    }

    /// Upper bound on a single document store operation
    #[must_use]
    pub fn store_operation_timeout(&self) -> Duration {
        let secs = env::var("STORE_OPERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_STORE_OPERATION_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Maximum accepted request body size in bytes
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Default log level when `RUST_LOG` is not set
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development => Level::DEBUG,
            })
    }
}
