//! Convenient re-exports of commonly used types from docshape.
//!
//! ```ignore
//! use docshape::prelude::*;
//! ```
//!
//! This provides access to the document model, the converter, search translation,
//! the gateway traits, the manager with its collection handles, and the error types.

pub use docshape_core::{
    collection::Collection,
    convert::{Converter, EncodeContext, ID_KEY},
    error::{DocumentError, DocumentResult},
    gateway::{GatewayBuilder, StoreGateway},
    manager::DocumentManager,
    object::{Object, Value},
    search::{FieldSelection, Inclusion, SearchSpec, SearchTranslator, Sort, SortDirection},
};
