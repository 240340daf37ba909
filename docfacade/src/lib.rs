//! Main docfacade crate: a thin facade over document-store collections.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! `docfacade-core` and provides access to the available drivers.
//!
//! # Features
//!
//! - **One connection, many collections** - Connect once, register a fixed set of collection names, borrow handles by name
//! - **Uniform operations** - Insert, find, aggregate, update and delete over opaque BSON filters
//! - **Explicit decode modes** - Cursors decode document by document or as a whole batch
//! - **Bounded calls** - Every operation takes a cancellable, deadline-bearing [`Context`](context::Context)
//!
//! # Quick Start
//!
//! ```ignore
//! use docfacade::{prelude::*, memory};
//! use bson::doc;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Task {
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> FacadeResult<()> {
//!     let manager = memory::connect("memory://local", "drag", ["batches", "tasks"]).await?;
//!     let ctx = Context::with_timeout(std::time::Duration::from_secs(5));
//!
//!     let tasks = manager.require_collection("tasks")?;
//!     let inserted = tasks.insert_one(&ctx, &doc! { "name": "a" }).await?;
//!
//!     let task: Task = tasks
//!         .find_one(&ctx, inserted.inserted_id().filter())
//!         .await?
//!         .decode()?;
//!     println!("found {task:?}");
//!
//!     manager.close().await
//! }
//! ```
//!
//! # Configuration
//!
//! ```ignore
//! use docfacade::{config::ClientConfig, memory};
//!
//! let config = ClientConfig::from_env()?;
//! let manager = memory::connect_with_config(&config).await?;
//! let ctx = config.context();
//! ```
//!
//! # Drivers
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB through the official driver (requires the `mongodb` feature)

pub mod prelude;

pub use docfacade_core::{client, collection, config, context, cursor, document, driver, error, registry, result};

// Re-export BSON types for convenience
pub use bson;

/// In-memory driver.
pub mod memory {
    pub use docfacade_memory::{MEMORY_SCHEME, MemoryConnector, MemoryDriver, connect, connect_with_config};
}

/// MongoDB driver.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docfacade_mongodb::{MongoConnector, MongoDriver, connect, connect_with_config};
}
