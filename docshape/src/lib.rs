//! Main docshape crate providing a unified interface over document stores.
//!
//! This crate is the primary entry point for users of docshape. It re-exports the
//! core types from the sub-crates and provides access to the available store gateways.
//!
//! # Features
//!
//! - **Dynamic documents** - Ordered objects of typed scalars, nested objects and homogeneous arrays
//! - **BSON conversion** - Identifier strings under `_id` become object ids on the wire and back
//! - **Search objects** - `$start`, `$limit`, `$fields` and `$orderBy` control pagination, projection and sort
//! - **Multiple gateways** - In-memory and MongoDB stores behind one async trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docshape::{prelude::*, memory::InMemoryGateway};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = DocumentManager::new(InMemoryGateway::builder().build().await.unwrap());
//!
//!     // Insert a document; the stored row comes back under `root`
//!     let inserted = manager
//!         .insert("users", &Object::new().with("name", "Alice").with("age", 31))
//!         .await
//!         .unwrap();
//!     let id = inserted.get_object_array("root").unwrap()[0].get_str("_id").unwrap().to_string();
//!
//!     // Page through users, newest age first, returning only their names
//!     let page = manager
//!         .find(
//!             "users",
//!             &Object::new()
//!                 .with("$limit", 10)
//!                 .with("$orderBy", vec!["-age"])
//!                 .with("$fields", vec!["name"]),
//!         )
//!         .await
//!         .unwrap();
//!
//!     println!("{} users, first page {:?}", page.get_long("total").unwrap(), page.get_object_array("root"));
//!
//!     manager
//!         .update(
//!             "users",
//!             &Object::new().with("_id", id.as_str()),
//!             &Object::new().with("$set", Object::new().with("age", 32)),
//!             false,
//!         )
//!         .await
//!         .unwrap();
//!
//!     manager.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Gateways
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - MongoDB gateway (requires `mongodb` feature)

pub mod prelude;

pub use docshape_core::{collection, convert, error, gateway, manager, object, search};

// Re-export BSON types for convenience
pub use bson;
pub use chrono;

/// In-memory gateway implementations.
pub mod memory {
    pub use docshape_memory::{InMemoryGateway, InMemoryGatewayBuilder};
}

/// MongoDB gateway implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docshape_mongodb::{MongoGateway, MongoGatewayBuilder};
}
