//! Immutable operation results.
//!
//! Each result wraps the driver's raw outcome and adds typed accessors.
//! Identifiers are surfaced as [`DocumentId`]s so they can be logged,
//! compared and persisted as strings.

use bson::Document;
use serde::de::DeserializeOwned;

use crate::{
    document::{DocumentId, decode_document},
    driver::UpdateOutcome,
    error::{FacadeError, FacadeResult},
};

/// Result of [`Collection::insert_one`](crate::collection::Collection::insert_one).
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    inserted_id: DocumentId,
}

impl InsertOneResult {
    pub(crate) fn new(inserted_id: DocumentId) -> Self {
        Self { inserted_id }
    }

    pub fn inserted_id(&self) -> &DocumentId {
        &self.inserted_id
    }
}

/// Result of [`Collection::insert_many`](crate::collection::Collection::insert_many).
///
/// Ids are in the same order as the input documents.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyResult {
    inserted_ids: Vec<DocumentId>,
}

impl InsertManyResult {
    pub(crate) fn new(inserted_ids: Vec<DocumentId>) -> Self {
        Self { inserted_ids }
    }

    pub fn inserted_ids(&self) -> &[DocumentId] {
        &self.inserted_ids
    }

    pub fn len(&self) -> usize {
        self.inserted_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted_ids.is_empty()
    }
}

/// Result of an update. Counts are passed through from the driver unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    matched_count: u64,
    modified_count: u64,
    upserted_id: Option<DocumentId>,
}

impl UpdateResult {
    pub fn matched_count(&self) -> u64 {
        self.matched_count
    }

    pub fn modified_count(&self) -> u64 {
        self.modified_count
    }

    /// 1 if the update inserted a new document, 0 otherwise.
    pub fn upserted_count(&self) -> u64 {
        u64::from(self.upserted_id.is_some())
    }

    /// The id of the inserted document, present only if an upsert occurred.
    pub fn upserted_id(&self) -> Option<&DocumentId> {
        self.upserted_id.as_ref()
    }
}

impl From<UpdateOutcome> for UpdateResult {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            matched_count: outcome.matched_count,
            modified_count: outcome.modified_count,
            upserted_id: outcome.upserted_id.map(DocumentId::new),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    deleted_count: u64,
}

impl DeleteResult {
    pub(crate) fn new(deleted_count: u64) -> Self {
        Self { deleted_count }
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted_count
    }
}

/// Result of [`Collection::find_one`](crate::collection::Collection::find_one).
///
/// A filter matching nothing produces a result in the "not found" state rather
/// than an error; the error only surfaces when decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleResult {
    collection: String,
    document: Option<Document>,
}

impl SingleResult {
    pub(crate) fn new(collection: String, document: Option<Document>) -> Self {
        Self { collection, document }
    }

    pub fn is_found(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn into_document(self) -> Option<Document> {
        self.document
    }

    /// Decodes the matched document into `T`.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NotFound`] if the query matched nothing
    /// - [`FacadeError::Decode`] if the document's shape does not fit `T`
    pub fn decode<T: DeserializeOwned>(&self) -> FacadeResult<T> {
        match &self.document {
            Some(document) => decode_document(document.clone(), None),
            None => Err(FacadeError::NotFound(format!(
                "no document matched the filter in collection {}",
                self.collection
            ))),
        }
    }
}
