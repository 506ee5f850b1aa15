//! Error types for data access operations.
//!
//! Every failure a builder chain can produce is a [`DataAccessError`]. Errors
//! carry an [`ErrorCode`] so callers can branch on the category without
//! matching on messages:
//!
//! - 1xxx: precondition violations raised before the engine is called
//! - 2xxx: integrity violations reported by the store (duplicate keys, validation)
//! - 3xxx: resource failures (connectivity, timeouts)
//! - 5xxx: execution failures
//! - 6xxx: document mapping failures
//! - 7xxx: configuration errors
//! - 9xxx: internal errors
//!
//! ```rust
//! use docmap_core::{DataAccessError, ErrorCode};
//!
//! let err = DataAccessError::invalid_argument("collection name must not be empty");
//! assert_eq!(err.code, ErrorCode::InvalidArgument);
//! assert!(err.is_precondition());
//! ```

use std::fmt;

use thiserror::Error;

/// Result type for data access operations.
pub type DataAccessResult<T> = Result<T, DataAccessError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Precondition errors (1xxx)
    /// An argument violated a precondition (D1001).
    InvalidArgument = 1001,
    /// An update terminal was reached without an update document (D1002).
    MissingUpdate = 1002,

    // Integrity errors (2xxx)
    /// A unique index rejected the write (D2001).
    DuplicateKey = 2001,
    /// The store rejected the write for another integrity reason (D2002).
    DataIntegrity = 2002,

    // Resource errors (3xxx)
    /// The store could not be reached (D3001).
    ResourceFailure = 3001,
    /// The operation timed out (D3002).
    Timeout = 3002,

    // Execution errors (5xxx)
    /// The engine reported a failure (D5001).
    Execution = 5001,
    /// A single result was expected but more were found (D5002).
    IncorrectResultSize = 5002,

    // Data errors (6xxx)
    /// A value could not be written as a document (D6001).
    Serialization = 6001,
    /// A document could not be read back as a value (D6002).
    Deserialization = 6002,

    // Configuration errors (7xxx)
    /// Invalid or missing configuration (D7001).
    InvalidConfiguration = 7001,

    /// Internal error (D9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "D1001").
    pub fn code(&self) -> String {
        format!("D{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "Invalid argument",
            Self::MissingUpdate => "Missing update document",
            Self::DuplicateKey => "Duplicate key",
            Self::DataIntegrity => "Data integrity violation",
            Self::ResourceFailure => "Data access resource failure",
            Self::Timeout => "Operation timed out",
            Self::Execution => "Execution failure",
            Self::IncorrectResultSize => "Incorrect result size",
            Self::Serialization => "Serialization error",
            Self::Deserialization => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Where an error happened.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed (e.g. `insert.one`).
    pub operation: Option<String>,
    /// The domain type involved.
    pub domain_type: Option<String>,
    /// The collection involved.
    pub collection: Option<String>,
}

/// Errors raised by builder chains and engines.
#[derive(Error, Debug)]
pub struct DataAccessError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DataAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;
        if let Some(ref op) = self.context.operation {
            write!(f, " (during {})", op)?;
        }
        Ok(())
    }
}

impl DataAccessError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Record the operation that failed.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Record the domain type involved.
    pub fn with_domain_type(mut self, domain_type: impl Into<String>) -> Self {
        self.context.domain_type = Some(domain_type.into());
        self
    }

    /// Record the collection involved.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.context.collection = Some(collection.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    /// Create a missing update error for the given domain type.
    pub fn missing_update(domain_type: impl Into<String>) -> Self {
        let domain_type = domain_type.into();
        Self::new(
            ErrorCode::MissingUpdate,
            format!("update for {} must not be empty", domain_type),
        )
        .with_domain_type(domain_type)
    }

    /// Create a duplicate key error.
    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateKey, message)
    }

    /// Create a data integrity error.
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataIntegrity, message)
    }

    /// Create a resource failure error.
    pub fn resource_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceFailure, message)
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("operation timed out after {}ms", duration_ms),
        )
    }

    /// Create an execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Execution, message)
    }

    /// Create an incorrect result size error.
    pub fn incorrect_result_size(expected: usize, actual: usize) -> Self {
        Self::new(
            ErrorCode::IncorrectResultSize,
            format!(
                "incorrect result size: expected {} but found at least {}",
                expected, actual
            ),
        )
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Serialization, message)
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Deserialization, message)
    }

    /// Create a configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    // ============== Predicates ==============

    /// Check if this error was raised before reaching the engine.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidArgument | ErrorCode::MissingUpdate
        )
    }

    /// Check if this is a duplicate key error.
    pub fn is_duplicate_key(&self) -> bool {
        self.code == ErrorCode::DuplicateKey
    }

    /// Check if this is a resource failure (including timeouts).
    pub fn is_resource_failure(&self) -> bool {
        matches!(self.code, ErrorCode::ResourceFailure | ErrorCode::Timeout)
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }
}

impl From<bson::ser::Error> for DataAccessError {
    fn from(err: bson::ser::Error) -> Self {
        DataAccessError::serialization(err.to_string()).with_source(err)
    }
}

impl From<bson::de::Error> for DataAccessError {
    fn from(err: bson::de::Error) -> Self {
        DataAccessError::deserialization(err.to_string()).with_source(err)
    }
}
