//! Stub driver for unit tests in this crate.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use futures::{StreamExt, stream};

use crate::{
    driver::{Connector, DocumentStream, Driver, UpdateOptions, UpdateOutcome},
    error::{FacadeError, FacadeResult},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Healthy,
    Stalled,
    Failing,
}

/// Healthy by default: writes succeed with fresh ObjectIds and reads return
/// nothing. `stalled` never completes a round trip, `failing` rejects every
/// call with the given reason.
#[derive(Debug, Default)]
pub(crate) struct StubDriver {
    mode: Mode,
    reason: String,
    calls: AtomicUsize,
}

impl StubDriver {
    pub(crate) fn stalled() -> Self {
        Self {
            mode: Mode::Stalled,
            ..Self::default()
        }
    }

    pub(crate) fn failing(reason: &str) -> Self {
        Self {
            mode: Mode::Failing,
            reason: reason.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn round_trip<T>(&self, ok: T, err: impl FnOnce(String) -> FacadeError) -> FacadeResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            Mode::Healthy => Ok(ok),
            Mode::Stalled => std::future::pending().await,
            Mode::Failing => Err(err(self.reason.clone())),
        }
    }
}

#[async_trait]
impl Driver for StubDriver {
    async fn insert_one(&self, _collection: &str, _document: Document) -> FacadeResult<Bson> {
        self.round_trip(Bson::ObjectId(ObjectId::new()), FacadeError::write)
            .await
    }

    async fn insert_many(&self, _collection: &str, documents: Vec<Document>) -> FacadeResult<Vec<Bson>> {
        let ids = documents
            .iter()
            .map(|_| Bson::ObjectId(ObjectId::new()))
            .collect();

        self.round_trip(ids, FacadeError::write).await
    }

    async fn find_one(&self, _collection: &str, _filter: Document) -> FacadeResult<Option<Document>> {
        self.round_trip(None, FacadeError::Query).await
    }

    async fn find(&self, _collection: &str, _filter: Document) -> FacadeResult<DocumentStream> {
        self.round_trip(stream::empty().boxed(), FacadeError::Query)
            .await
    }

    async fn aggregate(&self, _collection: &str, _pipeline: Vec<Document>) -> FacadeResult<DocumentStream> {
        self.round_trip(stream::empty().boxed(), FacadeError::Query)
            .await
    }

    async fn update_one(
        &self,
        _collection: &str,
        _filter: Document,
        _update: Document,
        _options: UpdateOptions,
    ) -> FacadeResult<UpdateOutcome> {
        self.round_trip(UpdateOutcome::default(), FacadeError::write)
            .await
    }

    async fn update_many(
        &self,
        _collection: &str,
        _filter: Document,
        _update: Document,
        _options: UpdateOptions,
    ) -> FacadeResult<UpdateOutcome> {
        self.round_trip(UpdateOutcome::default(), FacadeError::write)
            .await
    }

    async fn delete_one(&self, _collection: &str, _filter: Document) -> FacadeResult<u64> {
        self.round_trip(0, FacadeError::write).await
    }

    async fn delete_many(&self, _collection: &str, _filter: Document) -> FacadeResult<u64> {
        self.round_trip(0, FacadeError::write).await
    }

    async fn count_documents(&self, _collection: &str, _filter: Document) -> FacadeResult<u64> {
        self.round_trip(0, FacadeError::Query).await
    }

    async fn ping(&self) -> FacadeResult<()> {
        self.round_trip((), FacadeError::Connection).await
    }
}

/// Connector yielding a [`StubDriver`], or failing like an unreachable backend.
#[derive(Debug)]
pub(crate) struct StubConnector {
    pub(crate) uri: String,
    pub(crate) database: String,
    pub(crate) reachable: bool,
}

#[async_trait]
impl Connector for StubConnector {
    type Driver = StubDriver;

    fn uri(&self) -> &str {
        &self.uri
    }

    fn database(&self) -> &str {
        &self.database
    }

    async fn connect(self) -> FacadeResult<Self::Driver> {
        if self.reachable {
            Ok(StubDriver::default())
        } else {
            Err(FacadeError::Connection(format!("server selection timeout for {}", self.uri)))
        }
    }
}
