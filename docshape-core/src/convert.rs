//! Bidirectional conversion between [`Object`]s and BSON wire documents.
//!
//! Encoding is driven by the runtime kind of each [`Value`] plus the key it is
//! stored under: strings held by `_id` (and string arrays held by `_id`, or by a
//! key nested directly inside an `_id` object) become object identifiers.
//! Decoding is driven by the BSON element type. Anything either side cannot
//! represent is dropped from the output rather than reported as an error.

use bson::{Bson, Document, oid::ObjectId};
use tracing::trace;

use crate::{
    error::{DocumentError, DocumentResult},
    object::{Object, Value},
};

/// The reserved key whose strings are object identifiers on the wire.
pub const ID_KEY: &str = "_id";

/// Position of a value inside the object being encoded.
///
/// `key` is the key holding the value, `parent` the key holding the enclosing
/// object (`None` at the top level).
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    pub key: &'a str,
    pub parent: Option<&'a str>,
}

impl<'a> EncodeContext<'a> {
    pub fn new(key: &'a str, parent: Option<&'a str>) -> Self {
        Self { key, parent }
    }

    /// Whether the value itself sits under `_id`.
    pub fn is_id(&self) -> bool {
        self.key == ID_KEY
    }

    /// Whether array elements should be treated as identifiers.
    pub fn within_id(&self) -> bool {
        self.is_id() || self.parent == Some(ID_KEY)
    }
}

/// Stateless converter between the document model and BSON.
pub struct Converter;

impl Converter {
    /// Encodes a top-level object.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::MalformedIdentifier`] on the first `_id` string that
    /// is not a 24 digit hexadecimal identifier.
    pub fn encode(object: &Object) -> DocumentResult<Document> {
        Self::encode_with(object, None)
    }

    /// Encodes an object nested under `parent`.
    pub fn encode_with(object: &Object, parent: Option<&str>) -> DocumentResult<Document> {
        let mut document = Document::new();

        for (key, value) in object {
            if let Some(bson) = Self::encode_value(value, EncodeContext::new(key, parent))? {
                document.insert(key.clone(), bson);
            }
        }

        Ok(document)
    }

    /// Encodes every object in order, stopping at the first failure.
    pub fn encode_many<'a>(objects: impl IntoIterator<Item = &'a Object>) -> DocumentResult<Vec<Document>> {
        objects
            .into_iter()
            .map(Self::encode)
            .collect()
    }

    /// Encodes a single value, returning `None` for kinds the wire format does not carry.
    pub fn encode_value(value: &Value, context: EncodeContext<'_>) -> DocumentResult<Option<Bson>> {
        Ok(Some(match value {
            Value::String(s) if context.is_id() => Bson::ObjectId(Self::parse_object_id(s)?),
            Value::String(s) => Bson::String(s.clone()),
            Value::Integer(v) => Bson::Int32(*v),
            Value::Long(v) => Bson::Int64(*v),
            Value::Double(v) => Bson::Double(*v),
            Value::Decimal(number) => match number.as_f64() {
                Some(v) => Bson::Double(v),
                None => {
                    trace!(key = context.key, "dropping decimal outside double range");
                    return Ok(None);
                }
            },
            Value::Boolean(v) => Bson::Boolean(*v),
            // The wire value holds epoch seconds, not milliseconds.
            Value::DateTime(dt) => Bson::DateTime(bson::DateTime::from_millis(dt.timestamp())),
            Value::Object(nested) => Bson::Document(Self::encode_with(nested, Some(context.key))?),
            Value::StringArray(items) if context.within_id() => Bson::Array(
                items
                    .iter()
                    .map(|item| Self::parse_object_id(item).map(Bson::ObjectId))
                    .collect::<DocumentResult<Vec<_>>>()?,
            ),
            Value::StringArray(items) => Bson::Array(
                items
                    .iter()
                    .cloned()
                    .map(Bson::String)
                    .collect(),
            ),
            Value::IntegerArray(items) => Bson::Array(items.iter().copied().map(Bson::Int32).collect()),
            Value::DoubleArray(items) => Bson::Array(items.iter().copied().map(Bson::Double).collect()),
            Value::ObjectArray(items) => Bson::Array(
                items
                    .iter()
                    .map(|item| Self::encode(item).map(Bson::Document))
                    .collect::<DocumentResult<Vec<_>>>()?,
            ),
            Value::Null | Value::Binary(_) => {
                trace!(key = context.key, "dropping value with no wire representation");
                return Ok(None);
            }
        }))
    }

    /// Decodes a wire document. Elements of unsupported types are omitted.
    pub fn decode(document: &Document) -> Object {
        document
            .iter()
            .filter_map(|(key, value)| match Self::decode_value(value) {
                Some(decoded) => Some((key.clone(), decoded)),
                None => {
                    trace!(key = key.as_str(), element_type = ?value.element_type(), "dropping wire value");
                    None
                }
            })
            .collect()
    }

    pub fn decode_many<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Vec<Object> {
        documents
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Decodes a single wire value, returning `None` when it has no document-model counterpart.
    pub fn decode_value(value: &Bson) -> Option<Value> {
        match value {
            Bson::String(s) => Some(Value::String(s.clone())),
            Bson::Int32(v) => Some(Value::Integer(*v)),
            Bson::Int64(v) => Some(Value::Long(*v)),
            Bson::Double(v) => Some(Value::Double(*v)),
            Bson::Boolean(v) => Some(Value::Boolean(*v)),
            Bson::DateTime(dt) => match chrono::DateTime::from_timestamp(dt.timestamp_millis(), 0) {
                Some(dt) => Some(Value::DateTime(dt.fixed_offset())),
                None => {
                    trace!(seconds = dt.timestamp_millis(), "dropping out of range timestamp");
                    None
                }
            },
            Bson::Document(nested) => Some(Value::Object(Self::decode(nested))),
            Bson::ObjectId(oid) => Some(Value::String(oid.to_hex())),
            Bson::Array(items) => Self::decode_array(items),
            _ => None,
        }
    }

    /// Picks the array kind from the first element; later elements of another type are skipped.
    /// An empty array has no kind and decodes to nothing.
    fn decode_array(items: &[Bson]) -> Option<Value> {
        match items.first()? {
            Bson::Document(_) => Some(Value::ObjectArray(
                items
                    .iter()
                    .filter_map(Bson::as_document)
                    .map(Self::decode)
                    .collect(),
            )),
            Bson::String(_) => Some(Value::StringArray(
                items
                    .iter()
                    .filter_map(Bson::as_str)
                    .map(str::to_string)
                    .collect(),
            )),
            Bson::Int32(_) => Some(Value::IntegerArray(items.iter().filter_map(Bson::as_i32).collect())),
            Bson::Double(_) => Some(Value::DoubleArray(items.iter().filter_map(Bson::as_f64).collect())),
            _ => None,
        }
    }

    fn parse_object_id(value: &str) -> DocumentResult<ObjectId> {
        ObjectId::parse_str(value).map_err(|_| DocumentError::MalformedIdentifier(value.to_string()))
    }
}
