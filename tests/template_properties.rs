//! Integration tests for the fluent template against the in-memory engine.
//!
//! These tests verify the observable contract between a template and its
//! engine:
//! - Collection resolution (default and explicit)
//! - Empty batches and missing updates never reach the engine
//! - Upsert reporting
//! - One engine call per terminal, failures surfaced once

use docmap::prelude::*;
use docmap_core::options::UpdateMode;
use docmap_core::testing::{InMemoryEngine, RecordedCall};
use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Customer {
    firstname: String,
    lastname: String,
}

impl Customer {
    fn new(firstname: &str, lastname: &str) -> Self {
        Self {
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
        }
    }
}

impl Entity for Customer {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Jedi {
    firstname: String,
}

impl Entity for Jedi {
    const COLLECTION: Option<&'static str> = Some("star-wars");
}

/// Insert without a collection goes to the engine-resolved default
#[tokio::test]
async fn test_insert_uses_resolved_default_collection() {
    let template = DocumentTemplate::new(InMemoryEngine::new());

    assert_ok!(template.insert::<Customer>().one(Customer::new("Dave", "Matthews")).await);
    assert_ok!(template.insert::<Jedi>().one(Jedi { firstname: "luke".into() }).await);

    let collections: Vec<String> = template
        .engine()
        .calls()
        .into_iter()
        .map(|call| match call {
            RecordedCall::InsertOne(command) => command.collection,
            other => panic!("unexpected call {:?}", other),
        })
        .collect();
    assert_eq!(collections, vec!["customer", "star-wars"]);
}

/// An explicit collection is passed through untouched
#[tokio::test]
async fn test_explicit_collection_is_never_replaced() {
    let template = DocumentTemplate::new(InMemoryEngine::new());

    assert_ok!(
        template
            .insert::<Jedi>()
            .in_collection("rebels")
            .one(Jedi { firstname: "leia".into() })
            .await
    );
    let _: Vec<Jedi> = assert_ok!(
        template
            .find::<Jedi>()
            .in_collection("rebels")
            .all()
            .try_collect()
            .await
    );

    for call in template.engine().calls() {
        let collection = match call {
            RecordedCall::InsertOne(c) => c.collection,
            RecordedCall::Find(c) => c.collection,
            other => panic!("unexpected call {:?}", other),
        };
        assert_eq!(collection, "rebels");
    }
    assert!(template.engine().documents("star-wars").is_empty());
}

/// The people scenario: one insert call that echoes the object back
#[tokio::test]
async fn test_insert_one_into_people() {
    let template = DocumentTemplate::new(InMemoryEngine::new());
    let dave = Customer::new("Dave", "Matthews");

    let saved = assert_ok!(
        template
            .insert::<Customer>()
            .in_collection("people")
            .one(dave.clone())
            .await
    );

    assert_eq!(saved, dave);
    let calls = template.engine().calls();
    assert_eq!(calls.len(), 1);
    let RecordedCall::InsertOne(command) = &calls[0] else {
        panic!("expected insert one, got {:?}", calls[0]);
    };
    assert_eq!(command.collection, "people");
    assert_eq!(command.domain.name(), "Customer");
    assert_eq!(
        command.document,
        doc! { "firstname": "Dave", "lastname": "Matthews" }
    );
}

/// An empty batch completes immediately without an engine call
#[tokio::test]
async fn test_insert_all_empty() {
    let template = DocumentTemplate::new(InMemoryEngine::new());

    let saved: Vec<_> = template
        .insert::<Customer>()
        .in_collection("people")
        .all(Vec::new())
        .collect()
        .await;

    assert!(saved.is_empty());
    assert!(template.engine().calls().is_empty());
}

/// Every update terminal rejects an empty update before the engine
#[tokio::test]
async fn test_update_without_update_is_rejected() {
    let template = DocumentTemplate::new(InMemoryEngine::new());
    let chain = template
        .update::<Customer>()
        .matching(query(where_("firstname").is("Dave")))
        .apply(Update::new());

    let errors = vec![
        assert_err!(chain.clone().all().await),
        assert_err!(chain.clone().first().await),
        assert_err!(chain.clone().upsert().await),
        assert_err!(chain.find_and_modify().await.map(|_: Option<Customer>| ())),
    ];

    for err in errors {
        assert!(err.is_precondition());
        assert_eq!(err.code, ErrorCode::MissingUpdate);
    }
    assert!(template.engine().calls().is_empty());
}

/// Upsert reports an insert on no match and a modification on one match
#[tokio::test]
async fn test_upsert_reporting() {
    let engine = InMemoryEngine::new().with_documents(
        "customer",
        vec![doc! { "firstname": "Dave", "lastname": "Matthews" }],
    );
    let template = DocumentTemplate::new(engine);

    let inserted = assert_ok!(
        template
            .update::<Customer>()
            .matching(query(where_("firstname").is("Luke")))
            .apply(Update::set_value("lastname", "Skywalker"))
            .upsert()
            .await
    );
    assert!(inserted.was_upserted());
    assert_eq!(inserted.modified_count, 0);

    let modified = assert_ok!(
        template
            .update::<Customer>()
            .matching(query(where_("firstname").is("Dave")))
            .apply(Update::set_value("lastname", "Skywalker"))
            .upsert()
            .await
    );
    assert!(!modified.was_upserted());
    assert_eq!(modified.modified_count, 1);

    let luke: Option<Customer> = assert_ok!(
        template
            .find::<Customer>()
            .matching(query(where_("firstname").is("Luke")))
            .one()
            .await
    );
    assert_eq!(luke, Some(Customer::new("Luke", "Skywalker")));
}

/// The update-all scenario: one call with the default collection and options
#[tokio::test]
async fn test_update_all_scenario() {
    let template = DocumentTemplate::new(InMemoryEngine::new());

    assert_ok!(
        template
            .update::<Customer>()
            .matching(query(where_("firstname").is("Dave")))
            .apply(Update::set_value("lastname", "Skywalker"))
            .all()
            .await
    );

    let calls = template.engine().calls();
    assert_eq!(calls.len(), 1);
    let RecordedCall::Update(command) = &calls[0] else {
        panic!("expected update, got {:?}", calls[0]);
    };
    assert_eq!(command.collection, "customer");
    assert_eq!(command.filter, doc! { "firstname": "Dave" });
    assert_eq!(command.update, doc! { "$set": { "lastname": "Skywalker" } });
    assert_eq!(command.options, UpdateOptions::default());
    assert_eq!(command.mode, UpdateMode::All);
}

/// Ten stored documents come back as ten values in order
#[tokio::test]
async fn test_find_all_ten_in_order() {
    let docs = (0..10)
        .map(|i| doc! { "firstname": format!("Dave{}", i), "lastname": "Matthews" })
        .collect();
    let template = DocumentTemplate::new(InMemoryEngine::new().with_documents("customer", docs));

    let all: Vec<Customer> = assert_ok!(template.find_all::<Customer>().try_collect().await);

    assert_eq!(all.len(), 10);
    for (i, customer) in all.iter().enumerate() {
        assert_eq!(customer.firstname, format!("Dave{}", i));
    }
}

/// An injected failure surfaces once, after exactly one engine call
#[tokio::test]
async fn test_engine_failure_surfaces_once() {
    let engine = InMemoryEngine::new();
    engine.fail_next(DataAccessError::resource_failure("connection reset"));
    let template = DocumentTemplate::new(engine);

    let results: Vec<DataAccessResult<Customer>> = template.find_all::<Customer>().collect().await;

    assert_eq!(results.len(), 1);
    assert!(results[0].as_ref().unwrap_err().is_resource_failure());
    assert_eq!(template.engine().calls().len(), 1);
}

/// Mapped ids: `id` in a filter is sent as `_id`
#[tokio::test]
async fn test_id_field_is_mapped() {
    let template = DocumentTemplate::new(InMemoryEngine::new());
    let oid = bson::oid::ObjectId::new();

    let _: Option<Customer> = assert_ok!(
        template
            .find::<Customer>()
            .matching(query(where_("id").is(oid.to_hex())))
            .first()
            .await
    );

    let RecordedCall::Find(command) = &template.engine().calls()[0] else {
        panic!("expected find");
    };
    assert_eq!(command.filter, doc! { "_id": oid });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    id: Option<String>,
    name: String,
}

impl Entity for Person {}

/// An `id` property is stored under `_id` and comes back on read
#[tokio::test]
async fn test_id_round_trips_through_key() {
    let template = DocumentTemplate::new(InMemoryEngine::new());
    let dave = Person {
        id: Some("p1".into()),
        name: "Dave".into(),
    };

    let saved = assert_ok!(template.insert::<Person>().one(dave.clone()).await);
    assert_eq!(saved, dave);
    assert_eq!(
        template.engine().documents("person"),
        vec![doc! { "_id": "p1", "name": "Dave" }]
    );

    let found = assert_ok!(
        template
            .find::<Person>()
            .matching(query(where_("id").is("p1")))
            .one()
            .await
    );
    assert_eq!(found, Some(dave));
}

/// Engine-assigned and hex ids read back as hex strings
#[tokio::test]
async fn test_object_id_keys_read_back_as_hex() {
    let template = DocumentTemplate::new(InMemoryEngine::new());
    let oid = bson::oid::ObjectId::new();

    let assigned = assert_ok!(
        template
            .insert::<Person>()
            .one(Person {
                id: None,
                name: "Carter".into(),
            })
            .await
    );
    let hex = assert_ok!(
        template
            .insert::<Person>()
            .one(Person {
                id: Some(oid.to_hex()),
                name: "Boyd".into(),
            })
            .await
    );

    let stored = template.engine().documents("person");
    assert!(stored.iter().all(|d| d.get_object_id("_id").is_ok()));
    assert_eq!(hex.id, Some(oid.to_hex()));

    let assigned_id = assigned.id.clone().expect("engine assigned an id");
    let found = assert_ok!(
        template
            .find::<Person>()
            .matching(query(where_("id").is(assigned_id.as_str())))
            .first()
            .await
    );
    assert_eq!(found, Some(assigned));
}
