//! In-memory driver for docfacade.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! [`Driver`](docfacade_core::driver::Driver) trait. It uses an async-aware
//! read-write lock for concurrent access and is meant for development and tests.
//!
//! # Features
//!
//! - **MongoDB-style filters** - Implicit equality, comparison operators, `$exists`, `$not`, `$and`/`$or`/`$nor` and dotted paths
//! - **Update operators** - `$set`, `$unset`, `$inc` and upserts
//! - **Aggregation** - `$match`, `$sort`, `$skip`, `$limit`, `$project` and `$count`, executed when the cursor is first read
//! - **Duplicate keys** - `_id` uniqueness enforced per collection
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use docfacade_core::context::Context;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = docfacade_memory::connect("memory://local", "drag", ["tasks"]).await?;
//!     let tasks = manager.require_collection("tasks")?;
//!
//!     tasks.insert_one(&Context::background(), &doc! { "name": "a" }).await?;
//!
//!     manager.close().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docfacade_memory;

pub mod store;
mod evaluator;
mod pipeline;
mod update;

pub use store::{MEMORY_SCHEME, MemoryConnector, MemoryDriver, connect, connect_with_config};
