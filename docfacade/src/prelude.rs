//! Convenient re-exports of commonly used types from docfacade.
//!
//! ```ignore
//! use docfacade::prelude::*;
//! ```

pub use bson::{Document, doc};
pub use docfacade_core::{
    client::ConnectionManager,
    collection::Collection,
    config::{ClientConfig, ConnectionSettings},
    context::Context,
    cursor::Cursor,
    document::DocumentId,
    driver::{Connector, Driver, UpdateOptions},
    error::{ErrorKind, FacadeError, FacadeResult, WriteFailure},
    registry::CollectionRegistry,
    result::{DeleteResult, InsertManyResult, InsertOneResult, SingleResult, UpdateResult},
};
