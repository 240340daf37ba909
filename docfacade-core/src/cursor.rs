//! Single-use, server-backed cursors and their decode contract.
//!
//! A [`Cursor`] is produced by [`find`](crate::collection::Collection::find) or
//! [`aggregate`](crate::collection::Collection::aggregate) and consumed by one
//! of three modes:
//!
//! 1. **Streaming decode** ([`Cursor::stream_decode`], [`Cursor::documents`]):
//!    each document is decoded on its own as the cursor advances. The first
//!    failure stops iteration and reports the offending position in
//!    [`FacadeError::Decode`]`{ index: Some(i) }`.
//! 2. **Batch decode** ([`Cursor::decode_all`], [`Cursor::decode_single`]): the
//!    whole cursor is drained first, then converted in one BSON round trip. The
//!    destination of `decode_all` is a sequence by construction;
//!    `decode_single` is the single-object destination and refuses a cursor
//!    that yields more than one document instead of keeping only the first.
//! 3. **Manual iteration** ([`Cursor::next`], [`Cursor::next_as`]).
//!
//! Whichever mode is used, the cursor closes exactly once: on exhaustion, on
//! error, on cancellation, or through [`Cursor::close`]. Reads on a closed
//! cursor fail with [`FacadeError::CursorClosed`]. Closing again is a no-op,
//! unless done through [`Cursor::try_close`], which reports it.

use std::fmt;

use bson::Document;
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};

use crate::{
    context::Context,
    document::{decode_document, decode_documents},
    driver::DocumentStream,
    error::{FacadeError, FacadeResult},
};

pub struct Cursor {
    collection: String,
    stream: Option<DocumentStream>,
    position: usize,
}

impl Cursor {
    pub(crate) fn new(collection: String, stream: DocumentStream) -> Self {
        Self {
            collection,
            stream: Some(stream),
            position: 0,
        }
    }

    /// The collection this cursor reads from.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of documents yielded so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Closes the cursor, releasing the server-side iterator. Idempotent.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            trace!(collection = %self.collection, position = self.position, "cursor closed");
        }
    }

    /// Strict variant of [`Cursor::close`]: fails with
    /// [`FacadeError::CursorClosed`] if the cursor was already closed or
    /// exhausted.
    pub fn try_close(&mut self) -> FacadeResult<()> {
        if self.is_closed() {
            return Err(FacadeError::CursorClosed);
        }

        self.close();
        Ok(())
    }

    /// Advances the cursor by one document.
    ///
    /// Returns `Ok(None)` once the cursor is exhausted, at which point it is
    /// closed. Backend errors and cancellation also close the cursor.
    pub async fn next(&mut self, ctx: &Context) -> FacadeResult<Option<Document>> {
        let stream = self.stream.as_mut().ok_or(FacadeError::CursorClosed)?;
        let step = ctx.run(stream.try_next()).await;

        match step {
            Ok(Some(document)) => {
                self.position += 1;
                Ok(Some(document))
            }
            Ok(None) => {
                self.close();
                Ok(None)
            }
            Err(err) => {
                warn!(collection = %self.collection, position = self.position, error = %err, "cursor failed");
                self.close();
                Err(err)
            }
        }
    }

    /// Advances the cursor and decodes the document into `T`.
    ///
    /// A decode failure leaves the cursor open so the caller may continue past
    /// the offending document.
    pub async fn next_as<T: DeserializeOwned>(&mut self, ctx: &Context) -> FacadeResult<Option<T>> {
        let index = self.position;

        match self.next(ctx).await? {
            Some(document) => decode_document(document, Some(index)).map(Some),
            None => Ok(None),
        }
    }

    /// Streaming decode: decodes every remaining document individually.
    ///
    /// Stops at exhaustion or at the first failure. The cursor is closed on
    /// every exit path.
    pub async fn stream_decode<T: DeserializeOwned>(&mut self, ctx: &Context) -> FacadeResult<Vec<T>> {
        if self.is_closed() {
            return Err(FacadeError::CursorClosed);
        }

        let mut items = Vec::new();

        loop {
            let index = self.position;

            match self.next(ctx).await? {
                Some(document) => match decode_document(document, Some(index)) {
                    Ok(item) => items.push(item),
                    Err(err) => {
                        self.close();
                        return Err(err);
                    }
                },
                None => return Ok(items),
            }
        }
    }

    /// Streaming decode into generic documents.
    pub async fn documents(&mut self, ctx: &Context) -> FacadeResult<Vec<Document>> {
        self.stream_decode::<Document>(ctx).await
    }

    /// Batch decode: drains the cursor, then converts the whole sequence into
    /// `Vec<T>` in one round trip.
    ///
    /// The result has exactly as many elements as the cursor yielded documents.
    pub async fn decode_all<T: DeserializeOwned>(&mut self, ctx: &Context) -> FacadeResult<Vec<T>> {
        let documents = self.documents(ctx).await?;

        decode_documents(documents)
    }

    /// Batch decode into a single-object destination.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NotFound`] if the cursor yields no document
    /// - [`FacadeError::Decode`] if it yields more than one, or the document
    ///   does not fit `T`
    pub async fn decode_single<T: DeserializeOwned>(&mut self, ctx: &Context) -> FacadeResult<T> {
        let mut documents = self.documents(ctx).await?;

        match documents.len() {
            0 => Err(FacadeError::NotFound(format!(
                "cursor over collection {} yielded no documents",
                self.collection
            ))),
            1 => decode_document(documents.remove(0), None),
            n => Err(FacadeError::decode(
                None,
                format!(
                    "single-object destination cannot hold {n} documents from collection {}; \
                     decode into a sequence with decode_all",
                    self.collection
                ),
            )),
        }
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("collection", &self.collection)
            .field("position", &self.position)
            .field("closed", &self.is_closed())
            .finish()
    }
}
