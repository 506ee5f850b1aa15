//! MongoDB implementation of [`DocumentEngine`].

use bson::Document;
use docmap_core::engine::{
    BoxFuture, BoxStream, DocumentEngine, FindCommand, InsertManyCommand, InsertOneCommand,
    UpdateCommand,
};
use docmap_core::{DataAccessError, DataAccessResult, UpdateMode, UpdateOptions, UpdateOutcome};
use docmap_core::options::UpdateResult;
use futures::{FutureExt, StreamExt, TryFutureExt, TryStreamExt, stream};
use mongodb::Collection;
use mongodb::options::{
    FindOneAndDeleteOptions, FindOneAndUpdateOptions, FindOptions, ReturnDocument,
    UpdateOptions as DriverUpdateOptions,
};
use tracing::debug;

use crate::client::MongoClient;
use crate::config::MongoConfig;
use crate::document::DocumentExt;
use crate::error::{MongoError, MongoResult};

/// Executes template commands with the official MongoDB driver.
///
/// Each command maps onto exactly one driver call. The driver's own retry
/// settings ([`MongoConfig::retry_writes`], [`MongoConfig::retry_reads`])
/// still apply underneath.
#[derive(Debug, Clone)]
pub struct MongoEngine {
    client: MongoClient,
}

impl MongoEngine {
    /// Create an engine over an existing client.
    pub fn new(client: MongoClient) -> Self {
        Self { client }
    }

    /// Create a client from `config` and wrap it.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        Ok(Self::new(MongoClient::new(config).await?))
    }

    /// The underlying client.
    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.client.collection_doc(name)
    }
}

fn translate(err: mongodb::error::Error, collection: &str) -> DataAccessError {
    DataAccessError::from(MongoError::from(err)).with_collection(collection)
}

fn driver_update_options(options: &UpdateOptions, upsert: bool) -> DriverUpdateOptions {
    let mut driver = DriverUpdateOptions::default();
    driver.upsert = Some(upsert);
    driver.bypass_document_validation = options.bypass_document_validation;
    driver
}

fn summary(result: mongodb::results::UpdateResult) -> UpdateOutcome {
    UpdateOutcome::Summary(UpdateResult {
        matched_count: result.matched_count,
        modified_count: result.modified_count,
        upserted_id: result.upserted_id,
    })
}

impl DocumentEngine for MongoEngine {
    fn insert_one(&self, command: InsertOneCommand) -> BoxFuture<'_, DataAccessResult<Document>> {
        async move {
            debug!(collection = %command.collection, "insert_one");
            let result = self
                .collection(&command.collection)
                .insert_one(&command.document, None)
                .await
                .map_err(|e| translate(e, &command.collection))?;
            Ok(command.document.with_id(result.inserted_id))
        }
        .boxed()
    }

    fn insert_many(
        &self,
        command: InsertManyCommand,
    ) -> BoxStream<'_, DataAccessResult<Document>> {
        let written = async move {
            debug!(
                collection = %command.collection,
                count = command.documents.len(),
                "insert_many"
            );
            let mut result = self
                .collection(&command.collection)
                .insert_many(&command.documents, None)
                .await
                .map_err(|e| translate(e, &command.collection))?;

            let documents: Vec<Document> = command
                .documents
                .into_iter()
                .enumerate()
                .map(|(index, doc)| match result.inserted_ids.remove(&index) {
                    Some(id) => doc.with_id(id),
                    None => doc,
                })
                .collect();
            Ok::<_, DataAccessError>(stream::iter(
                documents.into_iter().map(Ok::<_, DataAccessError>),
            ))
        };
        written.try_flatten_stream().boxed()
    }

    fn update(&self, command: UpdateCommand) -> BoxFuture<'_, DataAccessResult<UpdateOutcome>> {
        async move {
            debug!(
                collection = %command.collection,
                mode = %command.mode,
                filter = %command.filter,
                "update"
            );
            let UpdateCommand {
                collection: name,
                filter,
                update,
                options,
                mode,
                ..
            } = command;
            let collection = self.collection(&name);

            let outcome = match mode {
                UpdateMode::All => collection
                    .update_many(filter, update, driver_update_options(&options, options.upsert))
                    .await
                    .map(summary),
                UpdateMode::First => collection
                    .update_one(filter, update, driver_update_options(&options, options.upsert))
                    .await
                    .map(summary),
                UpdateMode::Upsert => collection
                    .update_one(filter, update, driver_update_options(&options, true))
                    .await
                    .map(summary),
                UpdateMode::FindAndModify if options.remove => {
                    collection
                        .find_one_and_delete(filter, FindOneAndDeleteOptions::default())
                        .await
                        .map(UpdateOutcome::Document)
                }
                UpdateMode::FindAndModify => {
                    let mut driver = FindOneAndUpdateOptions::default();
                    driver.upsert = Some(options.upsert);
                    driver.bypass_document_validation = options.bypass_document_validation;
                    driver.return_document = Some(if options.return_new {
                        ReturnDocument::After
                    } else {
                        ReturnDocument::Before
                    });
                    collection
                        .find_one_and_update(filter, update, driver)
                        .await
                        .map(UpdateOutcome::Document)
                }
            };

            outcome.map_err(|e| translate(e, &name))
        }
        .boxed()
    }

    fn find(&self, command: FindCommand) -> BoxStream<'_, DataAccessResult<Document>> {
        let cursor = async move {
            debug!(
                collection = %command.collection,
                filter = %command.filter,
                limit = ?command.limit,
                "find"
            );
            let mut options = FindOptions::default();
            options.sort = command.sort;
            options.limit = command.limit;
            options.skip = command.skip;

            let collection = command.collection;
            let cursor = self
                .collection(&collection)
                .find(command.filter, options)
                .await
                .map_err(|e| translate(e, &collection))?;
            Ok::<_, DataAccessError>(cursor.map_err(move |e| translate(e, &collection)))
        };
        cursor.try_flatten_stream().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_core::DomainType;
    use docmap_core::Entity;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Customer;

    impl Entity for Customer {}

    #[test]
    fn test_driver_update_options() {
        let options = UpdateOptions::new().bypass_document_validation(true);
        let driver = driver_update_options(&options, true);
        assert_eq!(driver.upsert, Some(true));
        assert_eq!(driver.bypass_document_validation, Some(true));
    }

    #[tokio::test]
    async fn test_default_collection_name() {
        let engine = MongoEngine::connect(MongoConfig::from_uri(
            "mongodb://localhost:27017",
            "people",
        ))
        .await
        .unwrap();
        assert_eq!(
            engine.resolve_collection_name(&DomainType::of::<Customer>()),
            "customer"
        );
    }
}
