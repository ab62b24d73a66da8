//! A dynamically-typed document model with a BSON converter and query shaping for document stores.
//!
//! This crate is the core of the docshape project and provides:
//!
//! - **Document model** ([`object`]) - Ordered key/value objects with typed scalars and homogeneous arrays
//! - **Converter** ([`convert`]) - Bidirectional transcoding between objects and BSON wire documents
//! - **Query translation** ([`search`]) - Turns search objects with `$` control keys into filter, sort, projection and pagination
//! - **Store gateway abstraction** ([`gateway`]) - The thin async boundary to an actual document store
//! - **Manager** ([`manager`]) - Find, insert, update and delete expressed in document-model terms
//! - **Collections interface** ([`collection`]) - Handles bound to a single collection
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docshape_core::{convert::Converter, object::Object};
//!
//! let user = Object::new()
//!     .with("_id", "507f1f77bcf86cd799439011")
//!     .with("name", "Alice")
//!     .with("tags", vec!["admin", "ops"]);
//!
//! let wire = Converter::encode(&user)?;
//! assert_eq!(Converter::decode(&wire), user);
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshape_core;

pub mod collection;
pub mod convert;
pub mod error;
pub mod gateway;
pub mod manager;
pub mod object;
pub mod search;
