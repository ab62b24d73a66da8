//! Error types and result types for document conversion and store operations.
//!
//! Use [`DocumentResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised while converting documents or talking to a store.
///
/// Values the converter does not understand are never an error; they are dropped
/// from the output instead.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A string stored under `_id` is not a 24 digit hexadecimal object identifier.
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),
    /// A control key of a search object carries a value of the wrong shape.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A wire document could not be converted.
    #[error("Conversion error: {0}")]
    Conversion(String),
    /// Serialization/deserialization error when rendering documents (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during gateway initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// An error reported by the underlying document store.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

impl From<BsonError> for DocumentError {
    fn from(err: BsonError) -> Self {
        DocumentError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentError::Serialization(err.to_string())
    }
}
