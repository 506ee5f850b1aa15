//! The entry point for fluent operations.

use crate::engine::DocumentEngine;
use crate::entity::{DomainType, Entity};
use crate::error::DataAccessResult;
use crate::execution::{Blocking, Execution, Reactive};
use crate::mapper::QueryMapper;
use crate::operations::{FindOperation, InsertOperation, UpdateOperation};

/// Runs fluent insert, update and find operations against an engine.
///
/// The execution style `X` decides what terminals return: lazy futures and
/// streams with [`Reactive`] (the default), plain values with [`Blocking`].
///
/// ```rust,ignore
/// let template = DocumentTemplate::new(engine);
///
/// let dave = template
///     .insert::<Customer>()
///     .in_collection("people")
///     .one(Customer::new("Dave", "Matthews"))
///     .await?;
///
/// let result = template
///     .update::<Customer>()
///     .matching(query(where_("firstname").is("Dave")))
///     .apply(Update::set_value("lastname", "Skywalker"))
///     .all()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct DocumentTemplate<E, X = Reactive> {
    engine: E,
    execution: X,
    mapper: QueryMapper,
}

impl<E: DocumentEngine> DocumentTemplate<E, Reactive> {
    /// Create a template whose terminals return futures and streams.
    pub fn new(engine: E) -> Self {
        Self::with_execution(engine, Reactive)
    }
}

impl<E: DocumentEngine> DocumentTemplate<E, Blocking> {
    /// Create a template whose terminals block until the result is ready.
    pub fn blocking(engine: E) -> DataAccessResult<Self> {
        Ok(Self::with_execution(engine, Blocking::new()?))
    }
}

impl<E, X> DocumentTemplate<E, X>
where
    E: DocumentEngine,
    X: Execution,
{
    /// Create a template with an explicit execution style.
    pub fn with_execution(engine: E, execution: X) -> Self {
        Self {
            engine,
            execution,
            mapper: QueryMapper::new(),
        }
    }

    /// The engine commands are sent to.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The execution style.
    pub fn execution(&self) -> &X {
        &self.execution
    }

    pub(crate) fn mapper(&self) -> &QueryMapper {
        &self.mapper
    }

    /// The collection `T` is stored in unless a chain overrides it.
    pub fn collection_name<T: Entity>(&self) -> String {
        self.engine.resolve_collection_name(&DomainType::of::<T>())
    }

    /// Start an insert of `T` values.
    pub fn insert<T: Entity>(&self) -> InsertOperation<'_, E, X, T> {
        InsertOperation::new(self)
    }

    /// Start an update of `T` documents.
    pub fn update<T: Entity>(&self) -> UpdateOperation<'_, E, X, T> {
        UpdateOperation::new(self)
    }

    /// Start a find of `T` documents.
    pub fn find<T: Entity>(&self) -> FindOperation<'_, E, X, T> {
        FindOperation::new(self)
    }

    /// Every `T` in its default collection.
    pub fn find_all<T: Entity>(&self) -> X::Many<'_, T> {
        self.find::<T>().all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{query, where_};
    use crate::testing::InMemoryEngine;
    use crate::update::Update;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Customer {
        firstname: String,
        lastname: String,
    }

    impl Entity for Customer {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Jedi {
        firstname: String,
    }

    impl Entity for Jedi {
        const COLLECTION: Option<&'static str> = Some("star-wars");
    }

    #[test]
    fn test_collection_name() {
        let template = DocumentTemplate::new(InMemoryEngine::new());
        assert_eq!(template.collection_name::<Customer>(), "customer");
        assert_eq!(template.collection_name::<Jedi>(), "star-wars");
    }

    #[test]
    fn test_blocking_round() {
        let template = DocumentTemplate::blocking(InMemoryEngine::new()).unwrap();

        let dave = template
            .insert::<Customer>()
            .one(Customer {
                firstname: "Dave".into(),
                lastname: "Matthews".into(),
            })
            .unwrap();
        assert_eq!(dave.lastname, "Matthews");

        let result = template
            .update::<Customer>()
            .matching(query(where_("firstname").is("Dave")))
            .apply(Update::set_value("lastname", "Skywalker"))
            .all()
            .unwrap();
        assert_eq!(result.modified_count, 1);

        let all = template.find_all::<Customer>().unwrap();
        assert_eq!(
            all,
            vec![Customer {
                firstname: "Dave".into(),
                lastname: "Skywalker".into(),
            }]
        );
    }

    #[test]
    fn test_blocking_insert_all_in_declared_collection() {
        let template = DocumentTemplate::blocking(InMemoryEngine::new()).unwrap();

        let saved = template
            .insert::<Jedi>()
            .all(vec![
                Jedi { firstname: "Luke".into() },
                Jedi { firstname: "Leia".into() },
            ])
            .unwrap();

        assert_eq!(saved.len(), 2);
        let stored = template.engine().documents("star-wars");
        assert_eq!(stored[1].get_str("firstname").unwrap(), "Leia");
        assert!(stored[0].contains_key("_id"));
    }
}
