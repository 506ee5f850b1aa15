//! Insert operations.
//!
//! ```rust,ignore
//! template
//!     .insert::<Jedi>()
//!     .in_collection("star-wars")
//!     .one(luke)
//!     .await?;
//! ```

use futures::{FutureExt, StreamExt, TryStreamExt, future, stream};
use smol_str::SmolStr;
use tracing::debug;

use super::{
    OperationSpec, deferred, failed_stream, from_document, stop_after_error, to_document,
};
use crate::engine::{DocumentEngine, InsertManyCommand, InsertOneCommand};
use crate::entity::Entity;
use crate::execution::Execution;
use crate::template::DocumentTemplate;

operation_stage! {
    /// Entry stage of an insert: optionally pick a collection, then insert.
    InsertOperation
}

operation_stage! {
    /// Final stage of an insert.
    TerminatingInsertOperation
}

impl<'a, E, X, T> InsertOperation<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    pub(crate) fn new(template: &'a DocumentTemplate<E, X>) -> Self {
        Self::from_parts(template, OperationSpec::new::<T>())
    }

    /// Insert into `collection` instead of the domain type's default.
    ///
    /// The name must not be empty; an empty name fails the terminal call
    /// before anything is written.
    pub fn in_collection(
        self,
        collection: impl Into<SmolStr>,
    ) -> TerminatingInsertOperation<'a, E, X, T> {
        TerminatingInsertOperation::from_parts(
            self.template,
            self.spec.with_collection(collection.into()),
        )
    }

    /// Insert exactly one object.
    pub fn one(self, object: T) -> X::Single<'a, T> {
        insert_one(self.template, self.spec, object)
    }

    /// Insert a batch of objects.
    pub fn all(self, objects: impl IntoIterator<Item = T>) -> X::Many<'a, T> {
        insert_all(self.template, self.spec, objects)
    }
}

impl<'a, E, X, T> TerminatingInsertOperation<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    /// Insert exactly one object.
    ///
    /// Completes with the object as written, including any `_id` the store
    /// assigned.
    pub fn one(self, object: T) -> X::Single<'a, T> {
        insert_one(self.template, self.spec, object)
    }

    /// Insert a batch of objects.
    ///
    /// Yields one result per object in input order. An empty batch completes
    /// immediately without touching the engine.
    pub fn all(self, objects: impl IntoIterator<Item = T>) -> X::Many<'a, T> {
        insert_all(self.template, self.spec, objects)
    }
}

fn insert_one<'a, E, X, T>(
    template: &'a DocumentTemplate<E, X>,
    spec: OperationSpec,
    object: T,
) -> X::Single<'a, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    const OPERATION: &str = "insert.one";

    let prepared = spec
        .resolve_collection(template.engine(), OPERATION)
        .and_then(|collection| {
            let document = to_document(*template.mapper(), &object, OPERATION)?;
            Ok(InsertOneCommand {
                collection,
                domain: *spec.domain(),
                document,
            })
        });

    let future = match prepared {
        Ok(command) => {
            debug!(
                collection = %command.collection,
                domain_type = %command.domain,
                "Executing insert one"
            );
            let engine = template.engine();
            let mapper = *template.mapper();
            async move {
                let written = engine.insert_one(command).await?;
                from_document::<T>(mapper, written)
            }
            .boxed()
        }
        Err(err) => future::ready(Err(err)).boxed(),
    };

    template.execution().single(future)
}

fn insert_all<'a, E, X, T>(
    template: &'a DocumentTemplate<E, X>,
    spec: OperationSpec,
    objects: impl IntoIterator<Item = T>,
) -> X::Many<'a, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    const OPERATION: &str = "insert.all";

    let prepared = spec
        .resolve_collection(template.engine(), OPERATION)
        .and_then(|collection| {
            let documents = objects
                .into_iter()
                .map(|object| to_document(*template.mapper(), &object, OPERATION))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(InsertManyCommand {
                collection,
                domain: *spec.domain(),
                documents,
            })
        });

    let results = match prepared {
        Ok(command) if command.documents.is_empty() => {
            debug!(collection = %command.collection, "Skipping insert of empty batch");
            stream::empty().boxed()
        }
        Ok(command) => {
            debug!(
                collection = %command.collection,
                domain_type = %command.domain,
                count = command.documents.len(),
                "Executing insert many"
            );
            let engine = template.engine();
            let mapper = *template.mapper();
            let written = deferred(move || engine.insert_many(command))
                .and_then(move |doc| future::ready(from_document::<T>(mapper, doc)))
                .boxed();
            stop_after_error(written)
        }
        Err(err) => failed_stream(err),
    };

    template.execution().many(results)
}
