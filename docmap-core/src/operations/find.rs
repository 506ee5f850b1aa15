//! Find operations.

use futures::{FutureExt, StreamExt, TryStreamExt, future};
use smol_str::SmolStr;
use tracing::debug;

use super::{OperationSpec, deferred, failed_stream, from_document, stop_after_error};
use crate::engine::{BoxFuture, DocumentEngine, FindCommand};
use crate::entity::Entity;
use crate::error::{DataAccessError, DataAccessResult};
use crate::execution::Execution;
use crate::query::Query;
use crate::template::DocumentTemplate;

operation_stage! {
    /// Entry stage of a find.
    FindOperation
}

operation_stage! {
    /// Collection chosen; a filter may follow.
    FindOperationWithQuery
}

operation_stage! {
    /// Final stage of a find.
    TerminatingFindOperation
}

impl<'a, E, X, T> FindOperation<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    pub(crate) fn new(template: &'a DocumentTemplate<E, X>) -> Self {
        Self::from_parts(template, OperationSpec::new::<T>())
    }

    /// Read from `collection` instead of the domain type's default.
    pub fn in_collection(
        self,
        collection: impl Into<SmolStr>,
    ) -> FindOperationWithQuery<'a, E, X, T> {
        FindOperationWithQuery::from_parts(self.template, self.spec.with_collection(collection.into()))
    }

    /// Only read documents matching `query`.
    pub fn matching(self, query: impl Into<Query>) -> TerminatingFindOperation<'a, E, X, T> {
        TerminatingFindOperation::from_parts(self.template, self.spec.with_query(query.into()))
    }

    /// Every document in the collection.
    pub fn all(self) -> X::Many<'a, T> {
        find_all(self.template, self.spec)
    }

    /// The first document, if any.
    pub fn first(self) -> X::Single<'a, Option<T>> {
        find_first(self.template, self.spec)
    }

    /// The only document, failing when there is more than one.
    pub fn one(self) -> X::Single<'a, Option<T>> {
        find_one(self.template, self.spec)
    }
}

impl<'a, E, X, T> FindOperationWithQuery<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    /// Only read documents matching `query`.
    pub fn matching(self, query: impl Into<Query>) -> TerminatingFindOperation<'a, E, X, T> {
        TerminatingFindOperation::from_parts(self.template, self.spec.with_query(query.into()))
    }

    /// Every document in the collection.
    pub fn all(self) -> X::Many<'a, T> {
        find_all(self.template, self.spec)
    }

    /// The first document, if any.
    pub fn first(self) -> X::Single<'a, Option<T>> {
        find_first(self.template, self.spec)
    }

    /// The only document, failing when there is more than one.
    pub fn one(self) -> X::Single<'a, Option<T>> {
        find_one(self.template, self.spec)
    }
}

impl<'a, E, X, T> TerminatingFindOperation<'a, E, X, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    /// Every matching document, in the engine's order.
    pub fn all(self) -> X::Many<'a, T> {
        find_all(self.template, self.spec)
    }

    /// The first matching document, if any.
    pub fn first(self) -> X::Single<'a, Option<T>> {
        find_first(self.template, self.spec)
    }

    /// The only matching document.
    ///
    /// Fails with [`ErrorCode::IncorrectResultSize`](crate::ErrorCode) when
    /// more than one document matches.
    pub fn one(self) -> X::Single<'a, Option<T>> {
        find_one(self.template, self.spec)
    }
}

fn command<E: DocumentEngine, X: Execution>(
    template: &DocumentTemplate<E, X>,
    spec: &OperationSpec,
    operation: &str,
    limit: Option<i64>,
) -> DataAccessResult<FindCommand> {
    let collection = spec.resolve_collection(template.engine(), operation)?;
    let query = spec.query();
    let command = FindCommand {
        collection,
        domain: *spec.domain(),
        filter: template.mapper().map_filter(query.filter_document()),
        sort: query.sort_document().cloned(),
        limit: limit.or(query.get_limit()),
        skip: query.get_skip(),
    };

    debug!(
        collection = %command.collection,
        domain_type = %command.domain,
        filter = %command.filter,
        operation,
        "Executing find"
    );

    Ok(command)
}

fn find_all<'a, E, X, T>(template: &'a DocumentTemplate<E, X>, spec: OperationSpec) -> X::Many<'a, T>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    let results = match command(template, &spec, "find.all", None) {
        Ok(command) => {
            let engine = template.engine();
            let mapper = *template.mapper();
            let docs = deferred(move || engine.find(command))
                .and_then(move |doc| future::ready(from_document::<T>(mapper, doc)))
                .boxed();
            stop_after_error(docs)
        }
        Err(err) => failed_stream(err),
    };
    template.execution().many(results)
}

fn find_first<'a, E, X, T>(
    template: &'a DocumentTemplate<E, X>,
    spec: OperationSpec,
) -> X::Single<'a, Option<T>>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    let future: BoxFuture<'a, DataAccessResult<Option<T>>> =
        match command(template, &spec, "find.first", Some(1)) {
            Ok(command) => {
                let engine = template.engine();
                let mapper = *template.mapper();
                async move {
                    let mut docs = engine.find(command);
                    match docs.try_next().await? {
                        Some(doc) => from_document::<T>(mapper, doc).map(Some),
                        None => Ok(None),
                    }
                }
                .boxed()
            }
            Err(err) => future::ready(Err(err)).boxed(),
        };
    template.execution().single(future)
}

fn find_one<'a, E, X, T>(
    template: &'a DocumentTemplate<E, X>,
    spec: OperationSpec,
) -> X::Single<'a, Option<T>>
where
    E: DocumentEngine,
    X: Execution,
    T: Entity,
{
    let future: BoxFuture<'a, DataAccessResult<Option<T>>> =
        match command(template, &spec, "find.one", Some(2)) {
            Ok(command) => {
                let engine = template.engine();
                let mapper = *template.mapper();
                async move {
                    let mut docs = engine.find(command);
                    let Some(first) = docs.try_next().await? else {
                        return Ok(None);
                    };
                    if docs.try_next().await?.is_some() {
                        return Err(DataAccessError::incorrect_result_size(1, 2)
                            .with_operation("find.one"));
                    }
                    from_document::<T>(mapper, first).map(Some)
                }
                .boxed()
            }
            Err(err) => future::ready(Err(err)).boxed(),
        };
    template.execution().single(future)
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use futures::TryStreamExt;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use tokio_test::{assert_err, assert_ok};

    use crate::error::ErrorCode;
    use crate::query::{Query, query, where_};
    use crate::template::DocumentTemplate;
    use crate::testing::{InMemoryEngine, RecordedCall};
    use crate::Entity;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Customer {
        firstname: String,
        lastname: String,
    }

    impl Entity for Customer {}

    fn template() -> DocumentTemplate<InMemoryEngine> {
        DocumentTemplate::new(InMemoryEngine::new().with_documents(
            "customer",
            vec![
                doc! { "firstname": "Dave", "lastname": "Matthews" },
                doc! { "firstname": "Dave", "lastname": "Grohl" },
                doc! { "firstname": "Carter", "lastname": "Beauford" },
            ],
        ))
    }

    #[tokio::test]
    async fn test_all() {
        let template = template();
        let all: Vec<Customer> = assert_ok!(template.find::<Customer>().all().try_collect().await);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].firstname, "Carter");
    }

    #[tokio::test]
    async fn test_matching_all() {
        let template = template();
        let daves: Vec<Customer> = assert_ok!(
            template
                .find::<Customer>()
                .matching(query(where_("firstname").is("Dave")))
                .all()
                .try_collect()
                .await
        );
        let lastnames: Vec<_> = daves.iter().map(|c| c.lastname.as_str()).collect();
        assert_eq!(lastnames, vec!["Matthews", "Grohl"]);
    }

    #[tokio::test]
    async fn test_first_asks_for_one_document() {
        let template = template();
        let first = assert_ok!(template.find::<Customer>().first().await);
        assert_eq!(first.unwrap().lastname, "Matthews");

        let calls = template.engine().calls();
        assert!(matches!(&calls[0], RecordedCall::Find(c) if c.limit == Some(1)));
    }

    #[tokio::test]
    async fn test_one_rejects_multiple_matches() {
        let template = template();
        let err = assert_err!(
            template
                .find::<Customer>()
                .matching(query(where_("firstname").is("Dave")))
                .one()
                .await
        );
        assert_eq!(err.code, ErrorCode::IncorrectResultSize);
    }

    #[tokio::test]
    async fn test_one_single_match() {
        let template = template();
        let carter = assert_ok!(
            template
                .find::<Customer>()
                .matching(Query::from_json(r#"{"firstname": "Carter"}"#).unwrap())
                .one()
                .await
        );
        assert_eq!(carter.unwrap().lastname, "Beauford");
    }

    #[tokio::test]
    async fn test_in_collection_empty_collection_is_empty() {
        let template = template();
        let none: Vec<Customer> = assert_ok!(
            template
                .find::<Customer>()
                .in_collection("people")
                .all()
                .try_collect()
                .await
        );
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_query_limit_is_forwarded() {
        let template = template();
        let two: Vec<Customer> = assert_ok!(
            template
                .find::<Customer>()
                .matching(Query::new().limit(2))
                .all()
                .try_collect()
                .await
        );
        assert_eq!(two.len(), 2);
    }
}
