//! Staged fluent operations.
//!
//! Each operation starts from a [`DocumentTemplate`](crate::DocumentTemplate)
//! entry point and moves through stages that only expose the calls legal at
//! that point. Every stage method consumes the stage and returns a new one
//! carrying an extended [`OperationSpec`]; stages are `Clone`, so a partially
//! built chain can be reused from several call sites.
//!
//! - [`insert`]: entry, optional collection, terminal (`one`, `all`)
//! - [`update`]: entry, optional collection, optional filter, update,
//!   optional options, terminal (`find_and_modify`, `all`, `first`, `upsert`)
//! - [`find`]: entry, optional collection, optional filter, terminal
//!   (`all`, `first`, `one`)

use bson::Document;
use futures::{StreamExt, future};
use smol_str::SmolStr;

use crate::engine::{BoxStream, DocumentEngine};
use crate::entity::{DomainType, Entity};
use crate::error::{DataAccessError, DataAccessResult};
use crate::mapper::QueryMapper;
use crate::options::UpdateOptions;
use crate::query::Query;
use crate::update::Update;

/// Declares a builder stage: the struct, `Clone`, `Debug` and `spec()`.
macro_rules! operation_stage {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[must_use = "operations do nothing until a terminal method is called"]
        pub struct $name<'a, E, X, T> {
            template: &'a $crate::template::DocumentTemplate<E, X>,
            spec: $crate::operations::OperationSpec,
            _marker: ::std::marker::PhantomData<fn() -> T>,
        }

        impl<'a, E, X, T> $name<'a, E, X, T> {
            pub(crate) fn from_parts(
                template: &'a $crate::template::DocumentTemplate<E, X>,
                spec: $crate::operations::OperationSpec,
            ) -> Self {
                Self {
                    template,
                    spec,
                    _marker: ::std::marker::PhantomData,
                }
            }

            /// Everything the chain has collected so far.
            pub fn spec(&self) -> &$crate::operations::OperationSpec {
                &self.spec
            }
        }

        impl<'a, E, X, T> Clone for $name<'a, E, X, T> {
            fn clone(&self) -> Self {
                Self::from_parts(self.template, self.spec.clone())
            }
        }

        impl<'a, E, X, T> ::std::fmt::Debug for $name<'a, E, X, T> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("spec", &self.spec)
                    .finish()
            }
        }
    };
}

pub mod find;
pub mod insert;
pub mod update;

pub use find::{FindOperation, FindOperationWithQuery, TerminatingFindOperation};
pub use insert::{InsertOperation, TerminatingInsertOperation};
pub use update::{
    TerminatingUpdateOperation, UpdateOperation, UpdateOperationWithQuery,
    UpdateOperationWithUpdate,
};

/// Everything a builder chain has collected before its terminal call.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    domain: DomainType,
    collection: Option<SmolStr>,
    query: Query,
    update: Option<Update>,
    options: Option<UpdateOptions>,
}

impl OperationSpec {
    /// Start an empty operation on the entity type `T`.
    pub fn new<T: Entity>() -> Self {
        Self {
            domain: DomainType::of::<T>(),
            collection: None,
            query: Query::new(),
            update: None,
            options: None,
        }
    }

    /// The domain type.
    pub fn domain(&self) -> &DomainType {
        &self.domain
    }

    /// The explicit collection override.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// The filter query.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The update definition.
    pub fn update(&self) -> Option<&Update> {
        self.update.as_ref()
    }

    /// The update options.
    pub fn options(&self) -> Option<&UpdateOptions> {
        self.options.as_ref()
    }

    pub(crate) fn with_collection(mut self, collection: SmolStr) -> Self {
        self.collection = Some(collection);
        self
    }

    pub(crate) fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub(crate) fn with_update(mut self, update: Update) -> Self {
        self.update = Some(update);
        self
    }

    pub(crate) fn with_options(mut self, options: UpdateOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The collection to run against: the override, or the engine default.
    pub(crate) fn resolve_collection<E: DocumentEngine>(
        &self,
        engine: &E,
        operation: &str,
    ) -> DataAccessResult<String> {
        match self.collection {
            Some(ref name) if name.trim().is_empty() => Err(DataAccessError::invalid_argument(
                "collection name must not be empty",
            )
            .with_operation(operation)
            .with_domain_type(self.domain.name())),
            Some(ref name) => Ok(name.to_string()),
            None => Ok(engine.resolve_collection_name(&self.domain)),
        }
    }
}

pub(crate) fn to_document<T: Entity>(
    mapper: QueryMapper,
    value: &T,
    operation: &str,
) -> DataAccessResult<Document> {
    bson::to_document(value)
        .map(|doc| mapper.map_document(doc))
        .map_err(|e| DataAccessError::from(e).with_operation(operation))
}

/// Decode a stored document, retrying with a hex `id` for string-keyed types.
pub(crate) fn from_document<T: Entity>(mapper: QueryMapper, doc: Document) -> DataAccessResult<T> {
    let doc = mapper.unmap_document(doc);
    let Some(hex) = mapper.with_hex_id(&doc) else {
        return bson::from_document(doc).map_err(DataAccessError::from);
    };
    match bson::from_document(doc) {
        Ok(value) => Ok(value),
        Err(err) => bson::from_document(hex).map_err(|_| DataAccessError::from(err)),
    }
}

/// Ends the stream right after the first error.
pub(crate) fn stop_after_error<'a, T: Send + 'a>(
    stream: BoxStream<'a, DataAccessResult<T>>,
) -> BoxStream<'a, DataAccessResult<T>> {
    let mut failed = false;
    stream
        .take_while(move |item| {
            let keep = !failed;
            failed = failed || item.is_err();
            future::ready(keep)
        })
        .boxed()
}

/// Opens the stream on first poll, so nothing reaches the engine before that.
pub(crate) fn deferred<'a, T, F>(open: F) -> BoxStream<'a, T>
where
    T: Send + 'a,
    F: FnOnce() -> BoxStream<'a, T> + Send + 'a,
{
    futures::stream::once(async move { open() })
        .flatten()
        .boxed()
}

/// A stream that yields a single error.
pub(crate) fn failed_stream<'a, T: Send + 'a>(
    err: DataAccessError,
) -> BoxStream<'a, DataAccessResult<T>> {
    futures::stream::once(future::ready(Err(err))).boxed()
}
