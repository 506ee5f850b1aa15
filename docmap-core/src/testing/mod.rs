//! An in-memory [`DocumentEngine`] for tests and benchmarks.
//!
//! [`InMemoryEngine`] keeps documents per collection in insertion order and
//! records every command it receives, so tests can assert both on the data
//! and on exactly what the template sent.
//!
//! ```rust,ignore
//! let engine = InMemoryEngine::new()
//!     .with_documents("customer", vec![doc! { "firstname": "Dave" }]);
//! let template = DocumentTemplate::new(engine);
//!
//! let all: Vec<Customer> = template.find_all::<Customer>().try_collect().await?;
//! assert_eq!(template.engine().calls().len(), 1);
//! ```

mod matcher;

use std::cmp::Ordering;
use std::collections::HashMap;

use bson::oid::ObjectId;
use bson::{Bson, Document};
use futures::{FutureExt, StreamExt, future, stream};
use parking_lot::Mutex;

use crate::engine::{
    BoxFuture, BoxStream, DocumentEngine, FindCommand, InsertManyCommand, InsertOneCommand,
    UpdateCommand,
};
use crate::error::{DataAccessError, DataAccessResult};
use crate::options::{UpdateMode, UpdateOutcome, UpdateResult};

/// A command received by [`InMemoryEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// `insert_one`
    InsertOne(InsertOneCommand),
    /// `insert_many`
    InsertMany(InsertManyCommand),
    /// `update`
    Update(UpdateCommand),
    /// `find`
    Find(FindCommand),
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Vec<Document>>,
    calls: Vec<RecordedCall>,
    failure: Option<DataAccessError>,
}

impl State {
    /// Records the call and hands out a pending injected failure, if any.
    fn record(&mut self, call: RecordedCall) -> Option<DataAccessError> {
        self.calls.push(call);
        self.failure.take()
    }

    fn collection(&mut self, name: &str) -> &mut Vec<Document> {
        self.collections.entry(name.to_string()).or_default()
    }
}

/// Document store backed by process memory.
///
/// Every command is recorded before it runs, including commands that fail.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<State>,
}

impl InMemoryEngine {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `collection` with `documents`, stored as given.
    pub fn with_documents(self, collection: &str, documents: Vec<Document>) -> Self {
        self.state.lock().collection(collection).extend(documents);
        self
    }

    /// Make the next command fail with `err` without touching any data.
    pub fn fail_next(&self, err: DataAccessError) {
        self.state.lock().failure = Some(err);
    }

    /// Every command received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded commands, keeping the data.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// A snapshot of `collection` in storage order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.state
            .lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn run_update(state: &mut State, command: &UpdateCommand) -> UpdateOutcome {
        let docs = state.collection(&command.collection);
        let matching: Vec<usize> = docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| matcher::matches(doc, &command.filter))
            .map(|(index, _)| index)
            .collect();

        if command.mode == UpdateMode::FindAndModify {
            return UpdateOutcome::Document(find_and_modify(docs, &matching, command));
        }

        let targets = match command.mode {
            UpdateMode::All => &matching[..],
            _ => &matching[..matching.len().min(1)],
        };

        let mut result = UpdateResult {
            matched_count: targets.len() as u64,
            ..UpdateResult::default()
        };
        for &index in targets {
            if matcher::apply_update(&mut docs[index], &command.update, false) {
                result.modified_count += 1;
            }
        }
        if targets.is_empty() && command.options.upsert {
            let inserted = upserted(command);
            result.upserted_id = inserted.get("_id").cloned();
            docs.push(inserted);
        }

        UpdateOutcome::Summary(result)
    }
}

fn find_and_modify(
    docs: &mut Vec<Document>,
    matching: &[usize],
    command: &UpdateCommand,
) -> Option<Document> {
    let options = command.options;
    let Some(&index) = matching.first() else {
        if !options.upsert {
            return None;
        }
        let inserted = upserted(command);
        docs.push(inserted.clone());
        return options.return_new.then_some(inserted);
    };

    if options.remove {
        return Some(docs.remove(index));
    }

    let before = docs[index].clone();
    matcher::apply_update(&mut docs[index], &command.update, false);
    Some(if options.return_new { docs[index].clone() } else { before })
}

fn upserted(command: &UpdateCommand) -> Document {
    let mut doc = matcher::seed_from_filter(&command.filter);
    matcher::apply_update(&mut doc, &command.update, true);
    with_id(doc)
}

fn with_id(mut doc: Document) -> Document {
    if !doc.contains_key("_id") {
        doc.insert("_id", Bson::ObjectId(ObjectId::new()));
    }
    doc
}

fn select(docs: &[Document], command: &FindCommand) -> Vec<Document> {
    let mut selected: Vec<Document> = docs
        .iter()
        .filter(|doc| matcher::matches(doc, &command.filter))
        .cloned()
        .collect();

    if let Some(sort) = &command.sort {
        selected.sort_by(|a, b| {
            for (key, direction) in sort {
                let descending = matches!(direction, Bson::Int32(-1) | Bson::Int64(-1));
                let ordering = match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => matcher::compare(Some(x), y).unwrap_or(Ordering::Equal),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                let ordering = if descending { ordering.reverse() } else { ordering };
                if ordering.is_ne() {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    let skip = command.skip.unwrap_or(0) as usize;
    let limit = match command.limit {
        Some(0) | None => usize::MAX,
        Some(limit) => limit.unsigned_abs() as usize,
    };
    selected.into_iter().skip(skip).take(limit).collect()
}

impl DocumentEngine for InMemoryEngine {
    fn insert_one(&self, command: InsertOneCommand) -> BoxFuture<'_, DataAccessResult<Document>> {
        let mut state = self.state.lock();
        if let Some(err) = state.record(RecordedCall::InsertOne(command.clone())) {
            return future::ready(Err(err)).boxed();
        }

        let written = with_id(command.document);
        state.collection(&command.collection).push(written.clone());
        future::ready(Ok(written)).boxed()
    }

    fn insert_many(
        &self,
        command: InsertManyCommand,
    ) -> BoxStream<'_, DataAccessResult<Document>> {
        let mut state = self.state.lock();
        if let Some(err) = state.record(RecordedCall::InsertMany(command.clone())) {
            return stream::once(future::ready(Err(err))).boxed();
        }

        let written: Vec<Document> = command.documents.into_iter().map(with_id).collect();
        state
            .collection(&command.collection)
            .extend(written.iter().cloned());
        stream::iter(written.into_iter().map(Ok)).boxed()
    }

    fn update(&self, command: UpdateCommand) -> BoxFuture<'_, DataAccessResult<UpdateOutcome>> {
        let mut state = self.state.lock();
        if let Some(err) = state.record(RecordedCall::Update(command.clone())) {
            return future::ready(Err(err)).boxed();
        }

        let outcome = Self::run_update(&mut state, &command);
        future::ready(Ok(outcome)).boxed()
    }

    fn find(&self, command: FindCommand) -> BoxStream<'_, DataAccessResult<Document>> {
        let mut state = self.state.lock();
        if let Some(err) = state.record(RecordedCall::Find(command.clone())) {
            return stream::once(future::ready(Err(err))).boxed();
        }

        let found = state
            .collections
            .get(&command.collection)
            .map(|docs| select(docs, &command))
            .unwrap_or_default();
        stream::iter(found.into_iter().map(Ok)).boxed()
    }
}
