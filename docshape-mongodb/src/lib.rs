//! MongoDB store gateway for docshape.
//!
//! This crate provides a MongoDB-based implementation of the `StoreGateway` trait.
//! Searches are handed to the server as filter documents together with sort,
//! projection, skip and limit options, so all matching happens in MongoDB.
//!
//! To use this gateway, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docshape = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! A connection string and database name are given to the builder directly, or
//! read from the `MONGO_URL` and `MONGO_DB` environment variables with
//! [`MongoGatewayBuilder::from_env`]. Clients are pinned to stable server API version 1.
//!
//! # Example
//!
//! ```ignore
//! use docshape::{gateway::GatewayBuilder, manager::DocumentManager, mongodb::MongoGatewayBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = MongoGatewayBuilder::from_env()?
//!         .build()
//!         .await?;
//!     let manager = DocumentManager::new(gateway);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshape_mongodb;

pub mod store;

pub use store::{MongoGateway, MongoGatewayBuilder};
