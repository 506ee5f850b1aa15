//! MongoDB client wrapper.

use std::sync::Arc;
use std::time::Duration;

use bson::{Document, doc};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::{MongoConfig, MongoConfigBuilder};
use crate::error::{MongoError, MongoResult};

/// A MongoDB client bound to one database.
///
/// Connection pooling, server selection and driver-level retries are owned by
/// the driver; cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
}

impl std::fmt::Debug for MongoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoClient")
            .field("database", &self.config.database)
            .finish_non_exhaustive()
    }
}

impl MongoClient {
    /// Create a client for `config`.
    ///
    /// The driver connects lazily, so this succeeds without a reachable
    /// server; the first operation reports connection failures.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        let client = Client::with_options(config.to_client_options().await?)
            .map_err(|e| MongoError::connection(format!("cannot create client: {}", e)))?;
        let database = client.database(&config.database);

        info!(
            database = %config.database,
            app_name = config.app_name.as_deref().unwrap_or_default(),
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
        })
    }

    /// Configure a client setting by setting.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    /// A collection of raw BSON documents.
    pub fn collection_doc(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// The database this client is bound to.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// The underlying driver client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// The configuration the client was built from.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Ping the server.
    pub async fn is_healthy(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }

    /// Names of all collections in the database.
    pub async fn list_collections(&self) -> MongoResult<Vec<String>> {
        Ok(self.database.list_collection_names(None).await?)
    }

    /// Remove `name` and every document in it.
    pub async fn drop_collection(&self, name: &str) -> MongoResult<()> {
        debug!(collection = %name, "Dropping collection");
        self.database
            .collection::<Document>(name)
            .drop(None)
            .await?;
        Ok(())
    }

    /// Send a raw command to the bound database.
    pub async fn run_command(&self, command: Document) -> MongoResult<Document> {
        Ok(self.database.run_command(command, None).await?)
    }
}

/// Builds a [`MongoClient`] from individual settings.
///
/// Shorthand for building a [`MongoConfig`] and passing it to
/// [`MongoClient::new`].
#[derive(Debug, Clone, Default)]
pub struct MongoClientBuilder {
    config: MongoConfigBuilder,
}

impl MongoClientBuilder {
    /// A builder holding the configuration defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection string.
    pub fn uri(self, uri: impl Into<String>) -> Self {
        self.map(|config| config.uri(uri))
    }

    /// Database the client is bound to.
    pub fn database(self, database: impl Into<String>) -> Self {
        self.map(|config| config.database(database))
    }

    /// Name reported to the server.
    pub fn app_name(self, name: impl Into<String>) -> Self {
        self.map(|config| config.app_name(name))
    }

    /// Upper bound on pooled connections.
    pub fn max_pool_size(self, size: u32) -> Self {
        self.map(|config| config.max_pool_size(size))
    }

    /// TCP connect timeout.
    pub fn connect_timeout(self, timeout: Duration) -> Self {
        self.map(|config| config.connect_timeout(timeout))
    }

    /// Skip topology discovery.
    pub fn direct_connection(self, enabled: bool) -> Self {
        self.map(|config| config.direct_connection(enabled))
    }

    fn map(self, f: impl FnOnce(MongoConfigBuilder) -> MongoConfigBuilder) -> Self {
        Self {
            config: f(self.config),
        }
    }

    /// The configuration this builder describes.
    pub fn config(self) -> MongoResult<MongoConfig> {
        self.config.build()
    }

    /// Validate the settings and create the client.
    pub async fn build(self) -> MongoResult<MongoClient> {
        MongoClient::new(self.config()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_config() {
        let config = MongoClientBuilder::new()
            .uri("mongodb://localhost:27017")
            .database("people")
            .max_pool_size(20)
            .connect_timeout(Duration::from_secs(2))
            .config()
            .unwrap();

        assert_eq!(config.database, "people");
        assert_eq!(config.max_pool_size, Some(20));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_builder_requires_database() {
        assert!(MongoClientBuilder::new().config().is_err());
    }

    #[tokio::test]
    async fn test_new_does_not_connect() {
        // The driver connects lazily; creating a client never touches the network.
        let client = MongoClient::builder()
            .uri("mongodb://localhost:27017")
            .database("people")
            .build()
            .await
            .unwrap();

        assert_eq!(client.database().name(), "people");
        assert_eq!(client.collection_doc("customer").name(), "customer");
    }
}
