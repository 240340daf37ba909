//! Driver abstraction underneath the facade.
//!
//! A driver owns the actual connection to a document store and exposes the
//! three capabilities the facade needs: connect (via [`Connector`]), run one
//! operation per call, and iterate a server-backed cursor (via [`DocumentStream`]).
//!
//! Filters, updates and pipeline stages are passed through unmodified; the
//! facade never interprets query syntax.
//!
//! # Traits
//!
//! - [`Driver`]: the operations a backend must support
//! - [`Connector`]: factory that establishes a connection and yields a driver
//!
//! # Error mapping
//!
//! Implementers map their native errors onto the facade taxonomy by operation:
//! failures while connecting are [`FacadeError::Connection`](crate::error::FacadeError::Connection),
//! insert/update/delete failures are [`FacadeError::Write`](crate::error::FacadeError::Write),
//! and find/aggregate/count failures (including errors yielded by a
//! [`DocumentStream`]) are [`FacadeError::Query`](crate::error::FacadeError::Query).

use std::fmt::Debug;

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::stream::BoxStream;

use crate::error::FacadeResult;

/// A lazily evaluated stream of documents backing a [`Cursor`](crate::cursor::Cursor).
///
/// Dropping the stream releases any server-side cursor.
pub type DocumentStream = BoxStream<'static, FacadeResult<Document>>;

/// Options for update operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a new document when the filter matches nothing.
    pub upsert: bool,
}

impl UpdateOptions {
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// Raw outcome of an update as reported by the driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Bson>,
}

/// Abstract interface for document-store drivers.
///
/// Implementations must be safe for concurrent use: the facade shares one
/// driver between every collection handle and never serializes access to it.
/// Each method corresponds to exactly one round trip.
#[async_trait]
pub trait Driver: Send + Sync + Debug {
    /// Inserts one document, returning its `_id` (generated when absent).
    async fn insert_one(&self, collection: &str, document: Document) -> FacadeResult<Bson>;

    /// Inserts documents in order, returning their ids in the same order.
    ///
    /// When the backend stops part-way, the error must carry the ids that were
    /// inserted before the failure if the backend reports them.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> FacadeResult<Vec<Bson>>;

    /// Returns the first document matching `filter`, or `None`.
    async fn find_one(&self, collection: &str, filter: Document) -> FacadeResult<Option<Document>>;

    /// Opens a cursor over every document matching `filter`.
    async fn find(&self, collection: &str, filter: Document) -> FacadeResult<DocumentStream>;

    /// Opens a cursor over the output of an aggregation pipeline.
    ///
    /// Backends may defer validating the pipeline until the stream is first
    /// polled; such errors must then be yielded from the stream, not dropped.
    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> FacadeResult<DocumentStream>;

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> FacadeResult<UpdateOutcome>;

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> FacadeResult<UpdateOutcome>;

    /// Deletes at most one matching document, returning the deleted count.
    async fn delete_one(&self, collection: &str, filter: Document) -> FacadeResult<u64>;

    /// Deletes every matching document, returning the deleted count.
    async fn delete_many(&self, collection: &str, filter: Document) -> FacadeResult<u64>;

    async fn count_documents(&self, collection: &str, filter: Document) -> FacadeResult<u64>;

    /// Round trip to the backend to check it is reachable.
    async fn ping(&self) -> FacadeResult<()>;

    /// Cleanly shuts down the driver, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> FacadeResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory trait for establishing a driver connection.
#[async_trait]
pub trait Connector: Send {
    type Driver: Driver;

    /// The connection URI this connector targets.
    fn uri(&self) -> &str;

    /// The database the resulting driver is bound to.
    fn database(&self) -> &str;

    /// Connects, failing with [`FacadeError::Connection`](crate::error::FacadeError::Connection)
    /// if the backend cannot be reached.
    async fn connect(self) -> FacadeResult<Self::Driver>;
}
