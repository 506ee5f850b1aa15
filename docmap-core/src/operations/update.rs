//! Update and find-and-modify operations.
//!
//! ```rust,ignore
//! template
//!     .update::<Jedi>()
//!     .in_collection("star-wars")
//!     .matching(query(where_("firstname").is("luke")))
//!     .apply(Update::new().set("lastname", "skywalker"))
//!     .upsert()
//!     .await?;
//! ```
//!
//! A terminal is only reachable once an update has been applied:
//!
//! ```no_run
//! # use docmap_core::prelude::*;
//! # use docmap_core::engine::*;
//! # use docmap_core::UpdateOutcome;
//! # struct Nowhere;
//! # impl DocumentEngine for Nowhere {
//! #     fn insert_one(&self, _: InsertOneCommand) -> BoxFuture<'_, DataAccessResult<Document>> { unimplemented!() }
//! #     fn insert_many(&self, _: InsertManyCommand) -> BoxStream<'_, DataAccessResult<Document>> { unimplemented!() }
//! #     fn update(&self, _: UpdateCommand) -> BoxFuture<'_, DataAccessResult<UpdateOutcome>> { unimplemented!() }
//! #     fn find(&self, _: FindCommand) -> BoxStream<'_, DataAccessResult<Document>> { unimplemented!() }
//! # }
//! # #[derive(Serialize, Deserialize)]
//! # struct Jedi { firstname: String }
//! # impl Entity for Jedi {}
//! # let template = DocumentTemplate::new(Nowhere);
//! let pending = template
//!     .update::<Jedi>()
//!     .matching(query(where_("firstname").is("luke")))
//!     .apply(Update::set_value("lastname", "skywalker"))
//!     .all();
//! # drop(pending);
//! ```
//!
//! ```compile_fail
//! # use docmap_core::prelude::*;
//! # use docmap_core::engine::*;
//! # use docmap_core::UpdateOutcome;
//! # struct Nowhere;
//! # impl DocumentEngine for Nowhere {
//! #     fn insert_one(&self, _: InsertOneCommand) -> BoxFuture<'_, DataAccessResult<Document>> { unimplemented!() }
//! #     fn insert_many(&self, _: InsertManyCommand) -> BoxStream<'_, DataAccessResult<Document>> { unimplemented!() }
//! #     fn update(&self, _: UpdateCommand) -> BoxFuture<'_, DataAccessResult<UpdateOutcome>> { unimplemented!() }
//! #     fn find(&self, _: FindCommand) -> BoxStream<'_, DataAccessResult<Document>> { unimplemented!() }
//! # }
//! # #[derive(Serialize, Deserialize)]
//! # struct Jedi { firstname: String }
//! # impl Entity for Jedi {}
//! # let template = DocumentTemplate::new(Nowhere);
//! let pending = template
//!     .update::<Jedi>()
//!     .matching(query(where_("firstname").is("luke")))
//!     .all();
//! ```

use futures::{FutureExt, future};
use smol_str::SmolStr;
use tracing::debug;

use super::{OperationSpec, from_document};
use crate::engine::{BoxFuture, DocumentEngine, UpdateCommand};
use crate::entity::Entity;
use crate::error::{DataAccessError, DataAccessResult};
use crate::execution::Execution;
use crate::options::{UpdateMode, UpdateOptions, UpdateOutcome, UpdateResult};
use crate::query::Query;
use crate::template::DocumentTemplate;
use crate::update::Update;

operation_stage! {
    /// Entry stage of an update.
    UpdateOperation
}

operation_stage! {
    /// Collection chosen; a filter may follow.
    UpdateOperationWithQuery
}

operation_stage! {
    /// Filter chosen; the update must follow.
    UpdateOperationWithUpdate
}

operation_stage! {
    /// Update chosen; options may follow, then a terminal.
    TerminatingUpdateOperation
}

impl<'a, E, X, T> UpdateOperation<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    pub(crate) fn new(template: &'a DocumentTemplate<E, X>) -> Self {
        Self::from_parts(template, OperationSpec::new::<T>())
    }

    /// Update in `collection` instead of the domain type's default.
    pub fn in_collection(
        self,
        collection: impl Into<SmolStr>,
    ) -> UpdateOperationWithQuery<'a, E, X, T> {
        UpdateOperationWithQuery::from_parts(
            self.template,
            self.spec.with_collection(collection.into()),
        )
    }

    /// Only touch documents matching `query`.
    pub fn matching(self, query: impl Into<Query>) -> UpdateOperationWithUpdate<'a, E, X, T> {
        UpdateOperationWithUpdate::from_parts(self.template, self.spec.with_query(query.into()))
    }

    /// Set the update to apply to every document.
    pub fn apply(self, update: Update) -> TerminatingUpdateOperation<'a, E, X, T> {
        TerminatingUpdateOperation::from_parts(self.template, self.spec.with_update(update))
    }
}

impl<'a, E, X, T> UpdateOperationWithQuery<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    /// Only touch documents matching `query`.
    pub fn matching(self, query: impl Into<Query>) -> UpdateOperationWithUpdate<'a, E, X, T> {
        UpdateOperationWithUpdate::from_parts(self.template, self.spec.with_query(query.into()))
    }

    /// Set the update to apply to every document in the collection.
    pub fn apply(self, update: Update) -> TerminatingUpdateOperation<'a, E, X, T> {
        TerminatingUpdateOperation::from_parts(self.template, self.spec.with_update(update))
    }
}

impl<'a, E, X, T> UpdateOperationWithUpdate<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    /// Set the update to apply.
    pub fn apply(self, update: Update) -> TerminatingUpdateOperation<'a, E, X, T> {
        TerminatingUpdateOperation::from_parts(self.template, self.spec.with_update(update))
    }
}

impl<'a, E, X, T> TerminatingUpdateOperation<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    /// Replace the engine defaults.
    pub fn with_options(self, options: UpdateOptions) -> Self {
        Self::from_parts(self.template, self.spec.with_options(options))
    }

    /// Modify the first matching document and return it.
    ///
    /// Resolves to `None` when nothing matched. By default the document is
    /// returned as it was before the update; see [`UpdateOptions::return_new`].
    pub fn find_and_modify(self) -> X::Single<'a, Option<T>> {
        let future: BoxFuture<'a, DataAccessResult<Option<T>>> =
            match self.command(UpdateMode::FindAndModify) {
                Ok(command) => {
                    let engine = self.template.engine();
                    let mapper = *self.template.mapper();
                    async move {
                        match engine.update(command).await? {
                            UpdateOutcome::Document(Some(doc)) => {
                                from_document::<T>(mapper, doc).map(Some)
                            }
                            UpdateOutcome::Document(None) => Ok(None),
                            UpdateOutcome::Summary(_) => Err(DataAccessError::internal(
                                "engine answered findAndModify with an update summary",
                            )),
                        }
                    }
                    .boxed()
                }
                Err(err) => future::ready(Err(err)).boxed(),
            };
        self.template.execution().single(future)
    }

    /// Update every matching document.
    pub fn all(self) -> X::Single<'a, UpdateResult> {
        self.summary(UpdateMode::All)
    }

    /// Update at most one matching document.
    ///
    /// Which document counts as first is up to the engine; no ordering is
    /// guaranteed under concurrent writes.
    pub fn first(self) -> X::Single<'a, UpdateResult> {
        self.summary(UpdateMode::First)
    }

    /// Update the first matching document, or insert one built from the
    /// filter and the update when nothing matches.
    pub fn upsert(self) -> X::Single<'a, UpdateResult> {
        self.summary(UpdateMode::Upsert)
    }

    fn summary(self, mode: UpdateMode) -> X::Single<'a, UpdateResult> {
        let future: BoxFuture<'a, DataAccessResult<UpdateResult>> = match self.command(mode) {
            Ok(command) => {
                let engine = self.template.engine();
                async move {
                    match engine.update(command).await? {
                        UpdateOutcome::Summary(result) => Ok(result),
                        UpdateOutcome::Document(_) => Err(DataAccessError::internal(format!(
                            "engine answered {} with a document",
                            mode
                        ))),
                    }
                }
                .boxed()
            }
            Err(err) => future::ready(Err(err)).boxed(),
        };
        self.template.execution().single(future)
    }

    fn command(&self, mode: UpdateMode) -> DataAccessResult<UpdateCommand> {
        let operation = format!("update.{}", mode);
        let domain = *self.spec.domain();
        let collection = self
            .spec
            .resolve_collection(self.template.engine(), &operation)?;

        let update = match self.spec.update() {
            Some(update) if !update.is_empty() => update,
            _ => {
                return Err(DataAccessError::missing_update(domain.name())
                    .with_operation(operation)
                    .with_collection(collection));
            }
        };

        let mut options = self.spec.options().copied().unwrap_or_default();
        if mode == UpdateMode::Upsert {
            options.upsert = true;
        }

        let mapper = self.template.mapper();
        let command = UpdateCommand {
            collection,
            domain,
            filter: mapper.map_filter(self.spec.query().filter_document()),
            update: mapper.map_update(update.update_document()),
            options,
            mode,
        };

        debug!(
            collection = %command.collection,
            domain_type = %command.domain,
            mode = %mode,
            filter = %command.filter,
            "Executing update"
        );

        Ok(command)
    }
}
