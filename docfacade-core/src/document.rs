//! Document identifiers and BSON encoding helpers.
//!
//! Callers hand the facade any `Serialize` value for insertion and read results
//! back into any `Deserialize` type. The conversions all go through BSON, the
//! same representation the drivers speak.

use std::fmt;

use bson::{
    Bson, Document, doc,
    de::deserialize_from_bson,
    oid::ObjectId,
    ser::serialize_to_bson,
    spec::BinarySubtype,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{FacadeError, FacadeResult};

/// An identifier generated (or supplied) for a stored document.
///
/// The raw BSON value is kept so the id can be turned back into a filter, while
/// [`DocumentId::as_str`] exposes a canonical textual form suitable for logs and
/// external persistence:
///
/// - ObjectId: 24 lowercase hex characters
/// - String: the string itself
/// - Int32 / Int64: decimal
/// - UUID binary: hyphenated UUID
/// - anything else: the BSON display form
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentId {
    raw: Bson,
    display: String,
}

impl DocumentId {
    pub fn new(raw: Bson) -> Self {
        let display = match &raw {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s.clone(),
            Bson::Int32(i) => i.to_string(),
            Bson::Int64(i) => i.to_string(),
            Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => {
                match uuid::Uuid::from_slice(&binary.bytes) {
                    Ok(uuid) => uuid.hyphenated().to_string(),
                    Err(_) => raw.to_string(),
                }
            }
            other => other.to_string(),
        };

        Self { raw, display }
    }

    /// Parses a hex ObjectId string, as produced by [`DocumentId::as_str`].
    pub fn parse_object_id(hex: &str) -> FacadeResult<Self> {
        ObjectId::parse_str(hex)
            .map(|oid| Self::new(Bson::ObjectId(oid)))
            .map_err(|e| FacadeError::Query(format!("invalid object id {hex:?}: {e}")))
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    pub fn raw(&self) -> &Bson {
        &self.raw
    }

    pub fn into_raw(self) -> Bson {
        self.raw
    }

    /// Returns a `{ "_id": <id> }` filter selecting the identified document.
    pub fn filter(&self) -> Document {
        doc! { "_id": self.raw.clone() }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self::new(Bson::ObjectId(oid))
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.display
    }
}

/// Encodes a value for insertion. The value must serialize to a BSON document.
///
/// Failures are reported as [`FacadeError::Write`] since this only runs on the
/// write path.
pub fn encode_document<T: Serialize>(value: &T) -> FacadeResult<Document> {
    match serialize_to_bson(value) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(other) => Err(FacadeError::write(format!(
            "value must encode to a BSON document, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(FacadeError::write(format!("failed to encode document: {e}"))),
    }
}

/// Decodes a single document, tagging failures with its cursor position.
pub fn decode_document<T: DeserializeOwned>(document: Document, index: Option<usize>) -> FacadeResult<T> {
    deserialize_from_bson(Bson::Document(document))
        .map_err(|e| FacadeError::decode(index, e.to_string()))
}

/// Decodes a whole batch in one round trip: the documents are re-encoded as a
/// single BSON array and deserialized into a sequence of `T`.
pub fn decode_documents<T: DeserializeOwned>(documents: Vec<Document>) -> FacadeResult<Vec<T>> {
    let array = Bson::Array(documents.into_iter().map(Bson::Document).collect());

    deserialize_from_bson(array).map_err(|e| FacadeError::decode(None, e.to_string()))
}

/// Returns the document's `_id`, generating an ObjectId in front when absent.
///
/// Assigning ids client-side lets a driver report which documents of an
/// ordered batch were stored before a failure.
pub fn ensure_id(document: Document) -> (Bson, Document) {
    match document.get("_id") {
        Some(id) => (id.clone(), document),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            let document = std::iter::once(("_id".to_string(), id.clone()))
                .chain(document)
                .collect();

            (id, document)
        }
    }
}
