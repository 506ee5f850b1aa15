//! Settings for connecting an engine to a MongoDB deployment.
//!
//! Everything here is handed to the driver, which owns pooling, server
//! selection and retries. Values set on [`MongoConfig`] win over the same
//! setting in the connection string.

use std::time::Duration;

use mongodb::options::{
    Acknowledgment, ClientOptions, ReadPreference as DriverReadPreference, SelectionCriteria,
    WriteConcern as DriverWriteConcern,
};

use crate::error::{MongoError, MongoResult};

/// Environment variable holding the connection URI.
pub const URI_ENV: &str = "DOCMAP_MONGODB_URI";

/// Environment variable holding the database name.
pub const DATABASE_ENV: &str = "DOCMAP_MONGODB_DATABASE";

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_APP_NAME: &str = "docmap";

/// Where to connect and how the driver should behave.
#[derive(Debug, Clone, PartialEq)]
pub struct MongoConfig {
    /// Connection string.
    pub uri: String,
    /// Database every collection is resolved in.
    pub database: String,
    /// Reported to the server in the handshake.
    pub app_name: Option<String>,
    /// Connections the pool keeps open.
    pub min_pool_size: Option<u32>,
    /// Upper bound on pooled connections.
    pub max_pool_size: Option<u32>,
    /// Idle connections older than this are closed.
    pub max_idle_time: Option<Duration>,
    /// TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// How long an operation waits for a suitable server.
    pub server_selection_timeout: Option<Duration>,
    /// Which members reads go to.
    pub read_preference: Option<ReadPreference>,
    /// Acknowledgment required for writes.
    pub write_concern: Option<WriteConcern>,
    /// Let the driver retry a write once after a transient failure.
    pub retry_writes: Option<bool>,
    /// Let the driver retry a read once after a transient failure.
    pub retry_reads: Option<bool>,
    /// Talk to the given host only, skipping topology discovery.
    pub direct_connection: Option<bool>,
}

/// Replica set members reads may be served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPreference {
    /// The primary only.
    #[default]
    Primary,
    /// The primary, or a secondary when it is unavailable.
    PrimaryPreferred,
    /// Secondaries only.
    Secondary,
    /// A secondary, or the primary when none is available.
    SecondaryPreferred,
    /// Whichever member has the lowest latency.
    Nearest,
}

impl ReadPreference {
    fn to_driver(self) -> DriverReadPreference {
        let options = Default::default();
        match self {
            Self::Primary => DriverReadPreference::Primary,
            Self::PrimaryPreferred => DriverReadPreference::PrimaryPreferred { options },
            Self::Secondary => DriverReadPreference::Secondary { options },
            Self::SecondaryPreferred => DriverReadPreference::SecondaryPreferred { options },
            Self::Nearest => DriverReadPreference::Nearest { options },
        }
    }
}

/// Acknowledgment level for writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteConcern {
    /// This many members must acknowledge.
    W(u32),
    /// A majority of voting members must acknowledge.
    Majority,
    /// A named tag set from the replica set configuration.
    Custom(String),
}

impl WriteConcern {
    fn to_driver(&self) -> DriverWriteConcern {
        let w = match self {
            Self::W(n) => Acknowledgment::Nodes(*n),
            Self::Majority => Acknowledgment::Majority,
            Self::Custom(tag) => Acknowledgment::Custom(tag.clone()),
        };
        DriverWriteConcern::builder().w(w).build()
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: String::new(),
            app_name: Some(DEFAULT_APP_NAME.to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            max_idle_time: Some(Duration::from_secs(300)),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            read_preference: Some(ReadPreference::Primary),
            write_concern: None,
            retry_writes: Some(true),
            retry_reads: Some(true),
            direct_connection: None,
        }
    }
}

impl MongoConfig {
    /// Defaults for everything except the URI and database.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Read the URI and database from `DOCMAP_MONGODB_URI` and
    /// `DOCMAP_MONGODB_DATABASE`.
    ///
    /// The URI falls back to `mongodb://localhost:27017`; the database is
    /// required.
    pub fn from_env() -> MongoResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MongoResult<Self> {
        let mut builder = Self::builder();
        if let Some(uri) = lookup(URI_ENV).filter(|v| !v.trim().is_empty()) {
            builder = builder.uri(uri);
        }
        if let Some(database) = lookup(DATABASE_ENV) {
            builder = builder.database(database);
        }
        builder.build()
    }

    /// Start from the defaults.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Parse the connection string and lay these settings over it.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("invalid connection string: {}", e)))?;
        self.apply(&mut options);
        Ok(options)
    }

    fn apply(&self, options: &mut ClientOptions) {
        options.app_name = self.app_name.clone().or(options.app_name.take());
        options.min_pool_size = self.min_pool_size.or(options.min_pool_size);
        options.max_pool_size = self.max_pool_size.or(options.max_pool_size);
        options.max_idle_time = self.max_idle_time.or(options.max_idle_time);
        options.connect_timeout = self.connect_timeout.or(options.connect_timeout);
        options.server_selection_timeout = self
            .server_selection_timeout
            .or(options.server_selection_timeout);
        options.retry_writes = self.retry_writes.or(options.retry_writes);
        options.retry_reads = self.retry_reads.or(options.retry_reads);
        options.direct_connection = self.direct_connection.or(options.direct_connection);

        if let Some(preference) = self.read_preference {
            options.selection_criteria =
                Some(SelectionCriteria::ReadPreference(preference.to_driver()));
        }
        if let Some(concern) = &self.write_concern {
            options.write_concern = Some(concern.to_driver());
        }
    }
}

/// Generates `fn name(self, value) -> Self` setters for optional settings.
macro_rules! optional_settings {
    ($($(#[$doc:meta])* $name:ident: $ty:ty;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(mut self, value: $ty) -> Self {
                self.config.$name = Some(value);
                self
            }
        )*
    };
}

/// Builds a [`MongoConfig`] on top of the defaults.
///
/// Only the database is required.
#[derive(Debug, Clone, Default)]
pub struct MongoConfigBuilder {
    config: MongoConfig,
}

impl MongoConfigBuilder {
    /// A builder holding the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection string.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.config.uri = uri.into();
        self
    }

    /// Database every collection is resolved in.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = database.into();
        self
    }

    /// Name reported to the server.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = Some(name.into());
        self
    }

    optional_settings! {
        /// Connections the pool keeps open.
        min_pool_size: u32;
        /// Upper bound on pooled connections.
        max_pool_size: u32;
        /// Close idle connections after this long.
        max_idle_time: Duration;
        /// TCP connect timeout.
        connect_timeout: Duration;
        /// How long to wait for a suitable server.
        server_selection_timeout: Duration;
        /// Which members reads go to.
        read_preference: ReadPreference;
        /// Acknowledgment required for writes.
        write_concern: WriteConcern;
        /// Driver-level write retry.
        retry_writes: bool;
        /// Driver-level read retry.
        retry_reads: bool;
        /// Skip topology discovery.
        direct_connection: bool;
    }

    /// Finish, rejecting a missing or blank database name.
    pub fn build(self) -> MongoResult<MongoConfig> {
        if self.config.database.trim().is_empty() {
            return Err(MongoError::config("database name is required"));
        }
        Ok(self.config)
    }
}
