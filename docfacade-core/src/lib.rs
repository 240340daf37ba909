//! A thin document-store collection facade.
//!
//! This crate is the core of the docfacade project and provides:
//!
//! - **Connection management** ([`client`]) - One driver connection and a fixed set of collection handles
//! - **Collection registry** ([`registry`]) - The ordered, de-duplicated set of registered collection names
//! - **Collection handles** ([`collection`]) - CRUD and aggregation over one named collection
//! - **Operation results** ([`result`]) - Immutable values returned by each operation
//! - **Cursors** ([`cursor`]) - Single-use result streams with streaming and batch decode
//! - **Driver seam** ([`driver`]) - Traits for implementing storage backends
//! - **Execution context** ([`context`]) - Cancellation and deadlines for every operation
//! - **Configuration** ([`config`]) - Client settings from JSON or the environment
//! - **Error handling** ([`error`]) - The error taxonomy shared by every operation
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docfacade::{prelude::*, memory};
//!
//! #[tokio::main]
//! async fn main() -> FacadeResult<()> {
//!     let manager = memory::connect("memory://local", "drag", ["batches", "tasks"]).await?;
//!     let ctx = Context::background();
//!
//!     let tasks = manager.require_collection("tasks")?;
//!     tasks.insert_many(&ctx, &[doc! { "name": "a" }, doc! { "name": "b" }]).await?;
//!
//!     let names: Vec<Document> = tasks.find(&ctx, doc! {}).await?.documents(&ctx).await?;
//!     assert_eq!(names.len(), 2);
//!
//!     manager.close().await
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docfacade_core;

pub mod client;
pub mod collection;
pub mod config;
pub mod context;
pub mod cursor;
pub mod document;
pub mod driver;
pub mod error;
pub mod registry;
pub mod result;

#[cfg(test)]
mod testing;
