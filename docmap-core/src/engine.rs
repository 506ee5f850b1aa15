//! The execution collaborator that builder terminals delegate to.
//!
//! An engine only ever sees BSON documents. Mapping domain values to and
//! from documents, resolving collection names and validating preconditions
//! all happen in the template before a command is handed over.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bson::Document;
use futures::Stream;

use crate::entity::DomainType;
use crate::error::DataAccessResult;
use crate::options::{UpdateMode, UpdateOptions, UpdateOutcome};

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed stream.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Insert a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneCommand {
    /// Target collection.
    pub collection: String,
    /// Domain type the document was mapped from.
    pub domain: DomainType,
    /// The document to write.
    pub document: Document,
}

/// Insert a batch of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyCommand {
    /// Target collection.
    pub collection: String,
    /// Domain type the documents were mapped from.
    pub domain: DomainType,
    /// The documents to write, in order. Never empty.
    pub documents: Vec<Document>,
}

/// Update matching documents.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    /// Target collection.
    pub collection: String,
    /// Domain type the filter and update were mapped for.
    pub domain: DomainType,
    /// Filter; empty matches every document.
    pub filter: Document,
    /// Update document, grouped by operator. Never empty.
    pub update: Document,
    /// Execution flags.
    pub options: UpdateOptions,
    /// Which terminal issued the command.
    pub mode: UpdateMode,
}

/// Read matching documents.
#[derive(Debug, Clone, PartialEq)]
pub struct FindCommand {
    /// Source collection.
    pub collection: String,
    /// Domain type the results are read as.
    pub domain: DomainType,
    /// Filter; empty matches every document.
    pub filter: Document,
    /// Sort specification.
    pub sort: Option<Document>,
    /// Maximum number of documents.
    pub limit: Option<i64>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
}

/// A document store the template can execute commands against.
///
/// Each method makes at most one attempt; failures are reported once on the
/// returned future or stream. Implementations must not retry.
pub trait DocumentEngine: Send + Sync {
    /// Default collection name for a domain type.
    fn resolve_collection_name(&self, domain: &DomainType) -> String {
        domain.default_collection_name()
    }

    /// Insert one document, resolving to the document as written.
    fn insert_one(&self, command: InsertOneCommand) -> BoxFuture<'_, DataAccessResult<Document>>;

    /// Insert documents, yielding each as written in input order.
    fn insert_many(&self, command: InsertManyCommand)
    -> BoxStream<'_, DataAccessResult<Document>>;

    /// Apply an update.
    fn update(&self, command: UpdateCommand) -> BoxFuture<'_, DataAccessResult<UpdateOutcome>>;

    /// Stream matching documents.
    fn find(&self, command: FindCommand) -> BoxStream<'_, DataAccessResult<Document>>;
}

impl<E: DocumentEngine + ?Sized> DocumentEngine for Arc<E> {
    fn resolve_collection_name(&self, domain: &DomainType) -> String {
        (**self).resolve_collection_name(domain)
    }

    fn insert_one(&self, command: InsertOneCommand) -> BoxFuture<'_, DataAccessResult<Document>> {
        (**self).insert_one(command)
    }

    fn insert_many(
        &self,
        command: InsertManyCommand,
    ) -> BoxStream<'_, DataAccessResult<Document>> {
        (**self).insert_many(command)
    }

    fn update(&self, command: UpdateCommand) -> BoxFuture<'_, DataAccessResult<UpdateOutcome>> {
        (**self).update(command)
    }

    fn find(&self, command: FindCommand) -> BoxStream<'_, DataAccessResult<Document>> {
        (**self).find(command)
    }
}
