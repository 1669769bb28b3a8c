//! Process-wide document store connection
//!
//! A [`ConnectionManager`] is created once during startup and shared through
//! an `Arc`. The underlying client is established on the first call to
//! [`ConnectionManager::connect`] and reused for the rest of the process.

mod error;

use std::time::Duration;

use mongodb::{bson::doc, options::ClientOptions, Client, Collection, Database};
use tokio::sync::OnceCell;

pub use error::{ConnectionError, ConnectionResult};

/// Name reported to the server in connection handshakes
const APP_NAME: &str = "instabytes-backend";

/// Default time the driver waits to find a usable server
const DEFAULT_SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Holds the single client handle for the lifetime of the process
#[derive(Debug)]
pub struct ConnectionManager {
    connection_string: String,
    database_name: String,
    server_selection_timeout: Duration,
    client: OnceCell<Client>,
}

impl ConnectionManager {
    /// Creates a manager for the given connection string and database
    ///
    /// No network traffic happens here; see [`Self::connect`].
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::MissingConnectionString` if the connection
    /// string is absent or blank
    pub fn new(
        connection_string: Option<String>,
        database_name: impl Into<String>,
    ) -> ConnectionResult<Self> {
        let connection_string = connection_string
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConnectionError::MissingConnectionString)?;

        Ok(Self {
            connection_string,
            database_name: database_name.into(),
            server_selection_timeout: DEFAULT_SERVER_SELECTION_TIMEOUT,
            client: OnceCell::new(),
        })
    }

    /// Overrides how long the driver waits for a reachable server
    #[must_use]
    pub const fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    /// Name of the database all collections are read from
    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Whether the client has been established
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    /// Establishes the client on first use and returns the shared handle
    ///
    /// Concurrent first calls race on the same cell; exactly one client is
    /// built and every caller receives it.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidConnectionString` if the driver rejects
    /// the connection string, or `ConnectionError::Unreachable` if the
    /// database does not answer a ping
    pub async fn connect(&self) -> ConnectionResult<&Client> {
        self.client
            .get_or_try_init(|| async {
                let mut options = ClientOptions::parse(&self.connection_string)
                    .await
                    .map_err(ConnectionError::InvalidConnectionString)?;
                options.app_name = Some(APP_NAME.to_string());
                options.server_selection_timeout = Some(self.server_selection_timeout);

                let client =
                    Client::with_options(options).map_err(ConnectionError::InvalidConnectionString)?;

                client
                    .database(&self.database_name)
                    .run_command(doc! { "ping": 1 })
                    .await
                    .map_err(ConnectionError::Unreachable)?;

                tracing::info!(database = %self.database_name, "Connected to document store");
                Ok(client)
            })
            .await
    }

    /// Returns the configured database, connecting first if needed
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::connect`]
    pub async fn database(&self) -> ConnectionResult<Database> {
        Ok(self.connect().await?.database(&self.database_name))
    }

    /// Returns a named collection of the configured database
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::connect`]
    pub async fn collection<T>(&self, name: &str) -> ConnectionResult<Collection<T>>
    where
        T: Send + Sync,
    {
        Ok(self.database().await?.collection::<T>(name))
    }

    /// Closes the client if it was ever established
    pub async fn shutdown(&self) {
        if let Some(client) = self.client.get() {
            client.clone().shutdown().await;
            tracing::info!("Document store connection closed");
        }
    }
}
