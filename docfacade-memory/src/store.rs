//! In-memory driver.
//!
//! Documents are kept per collection in insertion order behind an async-aware
//! read-write lock. Reads take a snapshot under the read lock, so a cursor never
//! observes writes made after it was opened.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::{StreamExt, TryStreamExt, stream};
use mea::rwlock::RwLock;
use tracing::{debug, trace};

use docfacade_core::{
    client::{ConnectionManager, redact_uri},
    config::ClientConfig,
    document::{DocumentId, ensure_id},
    driver::{Connector, DocumentStream, Driver, UpdateOptions, UpdateOutcome},
    error::{FacadeError, FacadeResult, WriteFailure},
};

use crate::{
    evaluator::DocumentEvaluator,
    pipeline::run_pipeline,
    update::{apply_update, upsert_seed},
};

/// URI scheme accepted by [`MemoryConnector`].
pub const MEMORY_SCHEME: &str = "memory://";

type CollectionMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory [`Driver`].
///
/// `MemoryDriver` is cloneable and uses an `Arc`-wrapped internal state, so
/// clones share the same underlying data.
///
/// # Performance
///
/// Every query scans the whole collection (no indexing). Intended for
/// development and tests.
#[derive(Default, Clone, Debug)]
pub struct MemoryDriver {
    database: String,
    collections: Arc<RwLock<CollectionMap>>,
}

impl MemoryDriver {
    /// Creates an empty store for `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Arc::default(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn duplicate_key(&self, collection: &str, id: &Bson) -> String {
        format!(
            "E11000 duplicate key error collection: {}.{collection} index: _id_ dup key: {{ _id: {id} }}",
            self.database
        )
    }

    async fn matching(&self, collection: &str, filter: &Document) -> FacadeResult<Vec<Document>> {
        let collections = self.collections.read().await;

        match collections.get(collection) {
            Some(documents) => DocumentEvaluator::filter_documents(documents, filter),
            None => Ok(Vec::new()),
        }
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
        multi: bool,
    ) -> FacadeResult<UpdateOutcome> {
        // Rejects malformed updates even when nothing matches.
        apply_update(&Document::new(), &update)?;

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        let mut outcome = UpdateOutcome::default();
        let mut changes = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            if !DocumentEvaluator::new(document)
                .matches(&filter)
                .map_err(into_write)?
            {
                continue;
            }

            outcome.matched_count += 1;

            let updated = apply_update(document, &update)?;
            if &updated != document {
                changes.push((position, updated));
            }
            if !multi {
                break;
            }
        }

        // Applied only once every match succeeded, so a failing update changes nothing.
        outcome.modified_count = changes.len() as u64;
        for (position, updated) in changes {
            documents[position] = updated;
        }

        if outcome.matched_count == 0 && options.upsert {
            let seed = upsert_seed(&filter)?;
            let (id, document) = ensure_id(apply_update(&seed, &update)?);

            if contains_id(documents, &id) {
                return Err(FacadeError::write(self.duplicate_key(collection, &id)));
            }

            trace!(collection, id = %id, "upserted document");
            documents.push(document);
            outcome.upserted_id = Some(id);
        }

        Ok(outcome)
    }

    async fn delete(&self, collection: &str, filter: Document, multi: bool) -> FacadeResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut doomed = Vec::new();
        for (position, document) in documents.iter().enumerate() {
            if DocumentEvaluator::new(document)
                .matches(&filter)
                .map_err(into_write)?
            {
                doomed.push(position);
                if !multi {
                    break;
                }
            }
        }

        for position in doomed.iter().rev() {
            documents.remove(*position);
        }

        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn insert_one(&self, collection: &str, document: Document) -> FacadeResult<Bson> {
        let (id, document) = ensure_id(document);
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if contains_id(documents, &id) {
            return Err(FacadeError::write(self.duplicate_key(collection, &id)));
        }

        documents.push(document);

        Ok(id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> FacadeResult<Vec<Bson>> {
        let mut collections = self.collections.write().await;
        let stored = collections.entry(collection.to_string()).or_default();
        let mut ids = Vec::with_capacity(documents.len());

        // Ordered insert: stop at the first rejected document, keeping the ones before it.
        for document in documents {
            let (id, document) = ensure_id(document);

            if contains_id(stored, &id) {
                let inserted = ids
                    .into_iter()
                    .map(|id| String::from(DocumentId::new(id)))
                    .collect();

                return Err(FacadeError::Write(
                    WriteFailure::new(self.duplicate_key(collection, &id)).with_inserted_ids(inserted),
                ));
            }

            stored.push(document);
            ids.push(id);
        }

        Ok(ids)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> FacadeResult<Option<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(None);
        };

        for document in documents {
            if DocumentEvaluator::new(document).matches(&filter)? {
                return Ok(Some(document.clone()));
            }
        }

        Ok(None)
    }

    async fn find(&self, collection: &str, filter: Document) -> FacadeResult<DocumentStream> {
        let documents = self.matching(collection, &filter).await?;

        Ok(stream::iter(documents.into_iter().map(Ok)).boxed())
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> FacadeResult<DocumentStream> {
        let snapshot = self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default();

        // The pipeline only runs when the cursor is first polled, so stage
        // errors surface from the stream like a server-side execution error.
        Ok(stream::once(async move { run_pipeline(snapshot, &pipeline) })
            .map_ok(|documents| stream::iter(documents.into_iter().map(Ok::<_, FacadeError>)))
            .try_flatten()
            .boxed())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> FacadeResult<UpdateOutcome> {
        self.update(collection, filter, update, options, false).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> FacadeResult<UpdateOutcome> {
        self.update(collection, filter, update, options, true).await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> FacadeResult<u64> {
        self.delete(collection, filter, false).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> FacadeResult<u64> {
        self.delete(collection, filter, true).await
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> FacadeResult<u64> {
        Ok(self.matching(collection, &filter).await?.len() as u64)
    }

    async fn ping(&self) -> FacadeResult<()> {
        Ok(())
    }

    async fn shutdown(self) -> FacadeResult<()> {
        debug!(database = %self.database, "in-memory driver shut down");

        Ok(())
    }
}

/// Connector for `memory://` URIs.
///
/// # Example
///
/// ```ignore
/// use docfacade_core::client::ConnectionManager;
/// use docfacade_memory::MemoryConnector;
///
/// let manager = ConnectionManager::connect(
///     MemoryConnector::new("memory://local", "drag"),
///     ["batches", "tasks"],
/// )
/// .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    uri: String,
    database: String,
}

impl MemoryConnector {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Driver = MemoryDriver;

    fn uri(&self) -> &str {
        &self.uri
    }

    fn database(&self) -> &str {
        &self.database
    }

    async fn connect(self) -> FacadeResult<Self::Driver> {
        if !self.uri.starts_with(MEMORY_SCHEME) {
            return Err(FacadeError::Connection(format!(
                "unsupported URI {}: the in-memory driver expects the {MEMORY_SCHEME} scheme",
                redact_uri(&self.uri)
            )));
        }

        Ok(MemoryDriver::new(self.database))
    }
}

/// Connects a fresh in-memory store and registers `collections`.
pub async fn connect<I, S>(uri: &str, database: &str, collections: I) -> FacadeResult<ConnectionManager<MemoryDriver>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ConnectionManager::connect(MemoryConnector::new(uri, database), collections).await
}

/// Like [`connect`], reading everything from a [`ClientConfig`]. Pool settings
/// do not apply to the in-memory driver.
pub async fn connect_with_config(config: &ClientConfig) -> FacadeResult<ConnectionManager<MemoryDriver>> {
    config.validate()?;

    connect(&config.uri, &config.database, config.collections.iter().cloned()).await
}

fn contains_id(documents: &[Document], id: &Bson) -> bool {
    documents
        .iter()
        .any(|document| document.get("_id") == Some(id))
}

fn into_write(err: FacadeError) -> FacadeError {
    match err {
        FacadeError::Query(reason) => FacadeError::write(reason),
        other => other,
    }
}
