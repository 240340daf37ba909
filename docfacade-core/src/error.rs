//! Error types and result types for facade operations.
//!
//! Every public operation either returns a fully valid value or exactly one
//! [`FacadeError`]. Backend-reported reasons are carried verbatim; the facade
//! never retries.

use std::fmt;

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a document store
/// through the facade.
#[derive(Error, Debug, Clone)]
pub enum FacadeError {
    /// The backend could not be reached at construction time (bad URI, network, auth).
    #[error("Connection error: {0}")]
    Connection(String),
    /// An insert, update or delete was rejected by the backend.
    #[error("Write error: {0}")]
    Write(WriteFailure),
    /// A filter or pipeline was malformed, or the backend failed while executing a read.
    #[error("Query error: {0}")]
    Query(String),
    /// A single-result read matched no document.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// A stored document does not fit the requested destination type.
    ///
    /// `index` is the cursor position of the offending document when known.
    #[error("Decode error{}: {reason}", .index.map(|i| format!(" at document {i}")).unwrap_or_default())]
    Decode {
        index: Option<usize>,
        reason: String,
    },
    /// The cursor was already closed or exhausted.
    #[error("Cursor is closed")]
    CursorClosed,
    /// The caller's context was cancelled or its deadline passed mid-operation.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
    /// The requested collection name was not part of the registration list.
    #[error("Collection not registered: {0}")]
    CollectionNotRegistered(String),
    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Fieldless discriminant of [`FacadeError`], convenient for matching and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Write,
    Query,
    NotFound,
    Decode,
    CursorClosed,
    Cancelled,
    CollectionNotRegistered,
    Configuration,
}

impl FacadeError {
    /// Shorthand for a [`FacadeError::Write`] with no partially inserted documents.
    pub fn write(reason: impl Into<String>) -> Self {
        FacadeError::Write(WriteFailure::new(reason))
    }

    /// Shorthand for a [`FacadeError::Decode`].
    pub fn decode(index: Option<usize>, reason: impl Into<String>) -> Self {
        FacadeError::Decode {
            index,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FacadeError::Connection(_) => ErrorKind::Connection,
            FacadeError::Write(_) => ErrorKind::Write,
            FacadeError::Query(_) => ErrorKind::Query,
            FacadeError::NotFound(_) => ErrorKind::NotFound,
            FacadeError::Decode { .. } => ErrorKind::Decode,
            FacadeError::CursorClosed => ErrorKind::CursorClosed,
            FacadeError::Cancelled(_) => ErrorKind::Cancelled,
            FacadeError::CollectionNotRegistered(_) => ErrorKind::CollectionNotRegistered,
            FacadeError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Details of a rejected write.
///
/// `inserted_ids` lists, in input order, the identifiers the backend accepted
/// before failing. It is only populated for multi-document inserts and only
/// when the driver reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub reason: String,
    pub inserted_ids: Vec<String>,
}

impl WriteFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            inserted_ids: Vec::new(),
        }
    }

    pub fn with_inserted_ids(mut self, inserted_ids: Vec<String>) -> Self {
        self.inserted_ids = inserted_ids;
        self
    }

    /// Returns true if some documents were written before the failure.
    pub fn is_partial(&self) -> bool {
        !self.inserted_ids.is_empty()
    }
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        if self.is_partial() {
            write!(
                f,
                " ({} document(s) inserted before the failure: {})",
                self.inserted_ids.len(),
                self.inserted_ids.join(", ")
            )?;
        }
        Ok(())
    }
}

/// A specialized `Result` type for facade operations.
pub type FacadeResult<T> = Result<T, FacadeError>;

impl From<BsonError> for FacadeError {
    fn from(err: BsonError) -> Self {
        FacadeError::decode(None, err.to_string())
    }
}

impl From<SerdeJsonError> for FacadeError {
    fn from(err: SerdeJsonError) -> Self {
        FacadeError::Configuration(err.to_string())
    }
}
