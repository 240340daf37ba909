//! Collection handles.
//!
//! A [`Collection`] is a borrowed, stateless view of one registered collection.
//! It holds the collection name and a shared reference to the manager's driver,
//! so it is `Copy`, can be used from many tasks at once, and cannot outlive the
//! [`ConnectionManager`](crate::client::ConnectionManager) it came from.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docfacade::prelude::*;
//!
//! # async fn example(manager: &ConnectionManager<impl Driver>) -> FacadeResult<()> {
//! let ctx = Context::background();
//! let tasks = manager.require_collection("tasks")?;
//!
//! let inserted = tasks.insert_one(&ctx, &doc! { "name": "a" }).await?;
//! let found = tasks.find_one(&ctx, inserted.inserted_id().filter()).await?;
//! assert!(found.is_found());
//! # Ok(()) }
//! ```

use std::{fmt, future::Future};

use bson::Document;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    context::Context,
    cursor::Cursor,
    document::{DocumentId, encode_document},
    driver::{Driver, UpdateOptions},
    error::{FacadeError, FacadeResult},
    result::{DeleteResult, InsertManyResult, InsertOneResult, SingleResult, UpdateResult},
};

/// A handle for one named collection.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the borrowed connection manager
/// * `D` - The driver type
pub struct Collection<'a, D: Driver> {
    name: &'a str,
    driver: &'a D,
}

impl<'a, D: Driver> Collection<'a, D> {
    pub(crate) fn new(name: &'a str, driver: &'a D) -> Self {
        Self { name, driver }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &'a str {
        self.name
    }

    async fn run<T, F>(&self, ctx: &Context, operation: &'static str, future: F) -> FacadeResult<T>
    where
        F: Future<Output = FacadeResult<T>>,
    {
        debug!(collection = self.name, operation, "running operation");

        ctx.run(future).await.inspect_err(|err| {
            warn!(collection = self.name, operation, error = %err, "operation failed");
        })
    }

    /// Inserts one document.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::Write`] if the value does not encode to a document
    /// or the backend rejects it (e.g. duplicate key).
    pub async fn insert_one<T: Serialize>(&self, ctx: &Context, document: &T) -> FacadeResult<InsertOneResult> {
        let document = encode_document(document)?;
        let inserted_id = self
            .run(ctx, "insert_one", self.driver.insert_one(self.name, document))
            .await?;

        Ok(InsertOneResult::new(DocumentId::new(inserted_id)))
    }

    /// Inserts documents, returning their ids in input order.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::Write`] if `documents` is empty, a value does not
    /// encode to a document, or the backend rejects the batch. A partial insert
    /// is reported in the [`WriteFailure`](crate::error::WriteFailure).
    pub async fn insert_many<T: Serialize>(&self, ctx: &Context, documents: &[T]) -> FacadeResult<InsertManyResult> {
        if documents.is_empty() {
            return Err(FacadeError::write("insert_many requires at least one document"));
        }

        let documents = documents
            .iter()
            .map(encode_document)
            .collect::<FacadeResult<Vec<Document>>>()?;
        let inserted_ids = self
            .run(ctx, "insert_many", self.driver.insert_many(self.name, documents))
            .await?;

        Ok(InsertManyResult::new(
            inserted_ids
                .into_iter()
                .map(DocumentId::new)
                .collect(),
        ))
    }

    /// Finds the first document matching `filter`.
    ///
    /// Matching nothing is not an error: the returned [`SingleResult`] is in the
    /// "not found" state.
    pub async fn find_one(&self, ctx: &Context, filter: Document) -> FacadeResult<SingleResult> {
        let document = self
            .run(ctx, "find_one", self.driver.find_one(self.name, filter))
            .await?;

        Ok(SingleResult::new(self.name.to_string(), document))
    }

    /// Opens a cursor over every document matching `filter`.
    pub async fn find(&self, ctx: &Context, filter: Document) -> FacadeResult<Cursor> {
        let stream = self
            .run(ctx, "find", self.driver.find(self.name, filter))
            .await?;

        Ok(Cursor::new(self.name.to_string(), stream))
    }

    /// Runs an aggregation pipeline.
    ///
    /// Errors raised while building the pipeline are returned here; errors the
    /// backend defers until execution surface as [`FacadeError::Query`] on the
    /// first read from the cursor.
    pub async fn aggregate(&self, ctx: &Context, pipeline: Vec<Document>) -> FacadeResult<Cursor> {
        let stream = self
            .run(ctx, "aggregate", self.driver.aggregate(self.name, pipeline))
            .await?;

        Ok(Cursor::new(self.name.to_string(), stream))
    }

    pub async fn update_one(&self, ctx: &Context, filter: Document, update: Document) -> FacadeResult<UpdateResult> {
        self.update_one_with(ctx, filter, update, UpdateOptions::default())
            .await
    }

    pub async fn update_one_with(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> FacadeResult<UpdateResult> {
        Ok(self
            .run(ctx, "update_one", self.driver.update_one(self.name, filter, update, options))
            .await?
            .into())
    }

    pub async fn update_many(&self, ctx: &Context, filter: Document, update: Document) -> FacadeResult<UpdateResult> {
        self.update_many_with(ctx, filter, update, UpdateOptions::default())
            .await
    }

    pub async fn update_many_with(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> FacadeResult<UpdateResult> {
        Ok(self
            .run(ctx, "update_many", self.driver.update_many(self.name, filter, update, options))
            .await?
            .into())
    }

    pub async fn delete_one(&self, ctx: &Context, filter: Document) -> FacadeResult<DeleteResult> {
        let deleted = self
            .run(ctx, "delete_one", self.driver.delete_one(self.name, filter))
            .await?;

        Ok(DeleteResult::new(deleted))
    }

    pub async fn delete_many(&self, ctx: &Context, filter: Document) -> FacadeResult<DeleteResult> {
        let deleted = self
            .run(ctx, "delete_many", self.driver.delete_many(self.name, filter))
            .await?;

        Ok(DeleteResult::new(deleted))
    }

    /// Counts documents matching `filter`.
    pub async fn count_documents(&self, ctx: &Context, filter: Document) -> FacadeResult<u64> {
        self.run(ctx, "count_documents", self.driver.count_documents(self.name, filter))
            .await
    }
}

impl<D: Driver> Clone for Collection<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Driver> Copy for Collection<'_, D> {}

impl<D: Driver> fmt::Debug for Collection<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
