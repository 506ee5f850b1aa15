//! Error types for MongoDB operations and their translation into
//! [`DataAccessError`].

use docmap_core::DataAccessError;
use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Result of a call into this crate.
pub type MongoResult<T> = Result<T, MongoError>;

/// Server codes reported for unique index violations.
const DUPLICATE_KEY_CODES: [i32; 3] = [11000, 11001, 12582];

/// Failures raised by the MongoDB engine and its helpers.
///
/// Callers of a template never see this type directly: it is translated
/// into a [`DataAccessError`] before it leaves the engine.
#[derive(Error, Debug)]
pub enum MongoError {
    /// Reported by the driver, including server-side errors.
    #[error("driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// A value could not be encoded as BSON.
    #[error("cannot encode document: {0}")]
    Bson(#[from] bson::ser::Error),

    /// A document could not be decoded.
    #[error("cannot decode document: {0}")]
    BsonDe(#[from] bson::de::Error),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No client could be created.
    #[error("cannot connect: {0}")]
    Connection(String),

    /// A field was missing or held an unexpected type.
    #[error("unexpected field: {0}")]
    Field(String),

    /// A string that is not a 24-digit hex ObjectId.
    #[error("not an ObjectId: {0}")]
    InvalidObjectId(String),

    /// Gave up waiting after this many milliseconds.
    #[error("timed out after {0} ms")]
    Timeout(u64),
}

impl MongoError {
    /// Shorthand for [`MongoError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Shorthand for [`MongoError::Connection`].
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Shorthand for [`MongoError::Field`].
    pub fn field(message: impl Into<String>) -> Self {
        Self::Field(message.into())
    }

    /// Whether the client could not be created.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Whether this is [`MongoError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// The server error code, when the server reported one.
    pub fn server_code(&self) -> Option<i32> {
        match self {
            Self::Driver(err) => server_code(err),
            _ => None,
        }
    }
}

impl From<bson::oid::Error> for MongoError {
    fn from(err: bson::oid::Error) -> Self {
        Self::InvalidObjectId(err.to_string())
    }
}

fn server_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        ErrorKind::Write(WriteFailure::WriteConcernError(e)) => Some(e.code),
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|e| e.code),
        ErrorKind::Command(e) => Some(e.code),
        _ => None,
    }
}

fn translate_driver(err: &mongodb::error::Error, message: String) -> DataAccessError {
    match err.kind.as_ref() {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => DataAccessError::resource_failure(message),
        _ => match server_code(err) {
            Some(code) if DUPLICATE_KEY_CODES.contains(&code) => {
                DataAccessError::duplicate_key(message)
            }
            Some(_) => DataAccessError::data_integrity(message),
            None => DataAccessError::execution(message),
        },
    }
}

impl From<MongoError> for DataAccessError {
    fn from(err: MongoError) -> Self {
        let message = err.to_string();
        let translated = match &err {
            MongoError::Driver(e) => translate_driver(e, message),
            MongoError::Bson(_) => DataAccessError::serialization(message),
            MongoError::BsonDe(_) => DataAccessError::deserialization(message),
            MongoError::Config(_) => DataAccessError::invalid_configuration(message),
            MongoError::Connection(_) => DataAccessError::resource_failure(message),
            MongoError::Field(_) => DataAccessError::execution(message),
            MongoError::InvalidObjectId(_) => DataAccessError::invalid_argument(message),
            MongoError::Timeout(ms) => DataAccessError::timeout(*ms),
        };
        translated.with_source(err)
    }
}
