//! In-memory store gateway for docshape.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreGateway` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development,
//! testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Wire-level storage** - Stores documents as BSON, exactly as a real store would receive them
//! - **Filter evaluation** - Equality, comparison, membership, existence and `$and`/`$or`
//! - **Query shaping** - Multi-key sort, skip, limit and include/exclude projection
//! - **Update operators** - `$set`, `$unset` and `$inc`, all-or-nothing per call
//!
//! # Quick Start
//!
//! ```ignore
//! use docshape::{prelude::*, memory::InMemoryGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = InMemoryGateway::builder().build().await?;
//!     let manager = DocumentManager::new(gateway);
//!
//!     let inserted = manager
//!         .insert("users", &Object::new().with("name", "Alice"))
//!         .await?;
//!
//!     println!("{:?}", inserted.get_object_array("root"));
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshape_memory;

pub mod store;
mod evaluator;

pub use store::{InMemoryGateway, InMemoryGatewayBuilder};
