use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::{StreamExt, TryStreamExt};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind as MongoErrorKind},
    options::ClientOptions,
};
use tracing::{debug, info};

use docfacade_core::{
    client::{ConnectionManager, redact_uri},
    config::{ClientConfig, ConnectionSettings},
    document::{DocumentId, ensure_id},
    driver::{Connector, DocumentStream, Driver, UpdateOptions, UpdateOutcome},
    error::{FacadeError, FacadeResult, WriteFailure},
};

/// [`Driver`] backed by the official MongoDB driver.
///
/// The underlying [`Client`] is a connection pool and is cheap to share; one
/// `MongoDriver` serves every collection handle of a connection manager.
#[derive(Debug)]
pub struct MongoDriver {
    client: Client,
    database: String,
}

impl MongoDriver {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

#[async_trait]
impl Driver for MongoDriver {
    async fn insert_one(&self, collection: &str, document: Document) -> FacadeResult<Bson> {
        Ok(self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(write_error)?
            .inserted_id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> FacadeResult<Vec<Bson>> {
        // Ids are assigned here so a partial failure can report what was stored.
        let (ids, documents): (Vec<Bson>, Vec<Document>) = documents.into_iter().map(ensure_id).unzip();

        match self.get_collection(collection).insert_many(documents).await {
            Ok(_) => Ok(ids),
            Err(e) => {
                let stored = stored_before_failure(&e);
                Err(FacadeError::Write(
                    WriteFailure::new(e.to_string()).with_inserted_ids(inserted_prefix(&ids, stored)),
                ))
            }
        }
    }

    async fn find_one(&self, collection: &str, filter: Document) -> FacadeResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(query_error)
    }

    async fn find(&self, collection: &str, filter: Document) -> FacadeResult<DocumentStream> {
        Ok(self
            .get_collection(collection)
            .find(filter)
            .await
            .map_err(query_error)?
            .map_err(query_error)
            .boxed())
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> FacadeResult<DocumentStream> {
        Ok(self
            .get_collection(collection)
            .aggregate(pipeline)
            .await
            .map_err(query_error)?
            .map_err(query_error)
            .boxed())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> FacadeResult<UpdateOutcome> {
        let result = self
            .get_collection(collection)
            .update_one(filter, update)
            .upsert(options.upsert)
            .await
            .map_err(write_error)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> FacadeResult<UpdateOutcome> {
        let result = self
            .get_collection(collection)
            .update_many(filter, update)
            .upsert(options.upsert)
            .await
            .map_err(write_error)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> FacadeResult<u64> {
        Ok(self
            .get_collection(collection)
            .delete_one(filter)
            .await
            .map_err(write_error)?
            .deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> FacadeResult<u64> {
        Ok(self
            .get_collection(collection)
            .delete_many(filter)
            .await
            .map_err(write_error)?
            .deleted_count)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> FacadeResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(query_error)
    }

    async fn ping(&self) -> FacadeResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| FacadeError::Connection(format!("ping failed: {e}")))?;

        Ok(())
    }

    async fn shutdown(self) -> FacadeResult<()> {
        self.client.shutdown().await;
        debug!(database = %self.database, "mongodb client shut down");

        Ok(())
    }
}

/// Connector for `mongodb://` and `mongodb+srv://` URIs.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    uri: String,
    database: String,
    settings: ConnectionSettings,
}

impl MongoConnector {
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
            settings: ConnectionSettings::default(),
        }
    }

    /// Overrides the pool and verification settings.
    pub fn settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Driver = MongoDriver;

    fn uri(&self) -> &str {
        &self.uri
    }

    fn database(&self) -> &str {
        &self.database
    }

    async fn connect(self) -> FacadeResult<Self::Driver> {
        let mut client_options = ClientOptions::parse(&self.uri)
            .await
            .map_err(connection_error)?;
        apply_settings(&mut client_options, &self.settings);

        let driver = MongoDriver::new(
            Client::with_options(client_options).map_err(connection_error)?,
            self.database,
        );

        // The driver connects lazily; ping so bad hosts and credentials fail here.
        if self.settings.verify_connection {
            driver.ping().await?;
            info!(uri = %redact_uri(&self.uri), "mongodb connection verified");
        }

        Ok(driver)
    }
}

/// Connects to MongoDB and registers `collections`, with default settings.
pub async fn connect<I, S>(uri: &str, database: &str, collections: I) -> FacadeResult<ConnectionManager<MongoDriver>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ConnectionManager::connect(MongoConnector::new(uri, database), collections).await
}

/// Connects using every setting of a [`ClientConfig`].
pub async fn connect_with_config(config: &ClientConfig) -> FacadeResult<ConnectionManager<MongoDriver>> {
    config.validate()?;

    ConnectionManager::connect(
        MongoConnector::new(&config.uri, &config.database).settings(config.connection.clone()),
        config.collections.iter().cloned(),
    )
    .await
}

fn apply_settings(client_options: &mut ClientOptions, settings: &ConnectionSettings) {
    if let Some(min) = settings.min_pool_size {
        client_options.min_pool_size = Some(min);
    }
    if let Some(max) = settings.max_pool_size {
        client_options.max_pool_size = Some(max);
    }
    if let Some(connect) = settings.connect_timeout() {
        client_options.connect_timeout = Some(connect);
    }
    if let Some(server_selection) = settings.server_selection_timeout() {
        client_options.server_selection_timeout = Some(server_selection);
    }
    if let Some(app_name) = &settings.app_name {
        client_options.app_name = Some(app_name.clone());
    }
}

/// How many documents of an ordered insert were stored before `e`.
///
/// Ordered inserts stop at the first write error, so everything before its
/// index was written. A write-concern failure alone leaves every document
/// stored but unacknowledged. Other errors mean nothing is known to be stored.
fn stored_before_failure(e: &MongoError) -> Option<usize> {
    match e.kind.as_ref() {
        MongoErrorKind::InsertMany(failure) => Some(
            failure
                .write_errors
                .as_ref()
                .and_then(|errors| errors.iter().map(|error| error.index).min())
                .unwrap_or(usize::MAX),
        ),
        _ => None,
    }
}

fn inserted_prefix(ids: &[Bson], stored: Option<usize>) -> Vec<String> {
    let stored = stored.unwrap_or(0).min(ids.len());

    ids[..stored]
        .iter()
        .cloned()
        .map(|id| String::from(DocumentId::new(id)))
        .collect()
}

fn connection_error(e: MongoError) -> FacadeError {
    FacadeError::Connection(e.to_string())
}

fn write_error(e: MongoError) -> FacadeError {
    FacadeError::write(e.to_string())
}

fn query_error(e: MongoError) -> FacadeError {
    FacadeError::Query(e.to_string())
}
