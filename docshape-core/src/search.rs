//! Translation of search objects into store query specifications.
//!
//! A search object is a plain [`Object`] whose reserved `$`-prefixed control keys
//! shape the query instead of filtering data:
//!
//! - `$start` - number of matching documents to skip
//! - `$limit` - maximum number of documents to return; also requests a total count
//! - `$fields` - field projection, `-field` excludes and `field` includes
//! - `$orderBy` - sort keys in precedence order, `-field` descends, `+field` or `field` ascends
//!
//! Everything else is encoded with the [`Converter`] into the filter document.
//!
//! # Example
//!
//! ```ignore
//! use docshape_core::{object::Object, search::SearchTranslator};
//!
//! let search = Object::new()
//!     .with("name", "a")
//!     .with("$limit", 10)
//!     .with("$start", 5)
//!     .with("$orderBy", vec!["-age", "name"]);
//!
//! let spec = SearchTranslator::translate(&search)?;
//! assert_eq!(spec.filter, bson::doc! { "name": "a" });
//! ```

use bson::{Bson, Document};

use crate::{
    convert::{Converter, ID_KEY},
    error::{DocumentError, DocumentResult},
    object::{Object, Value},
};

pub const FIELD_START: &str = "$start";
pub const FIELD_LIMIT: &str = "$limit";
pub const FIELD_FIELDS: &str = "$fields";
pub const FIELD_ORDER_BY: &str = "$orderBy";
/// Key holding the result rows of a find, and the rows of a batch insert.
pub const FIELD_ROOT: &str = "root";
/// Key holding the total match count of a limited find.
pub const FIELD_TOTAL: &str = "total";

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Parses `-field`, `+field` or `field`.
    pub fn parse(entry: &str) -> DocumentResult<Self> {
        let (field, direction) = match entry.strip_prefix('-') {
            Some(field) => (field, SortDirection::Desc),
            None => (entry.strip_prefix('+').unwrap_or(entry), SortDirection::Asc),
        };

        Ok(Self {
            field: non_empty_field(field, FIELD_ORDER_BY)?,
            direction,
        })
    }
}

/// Whether a projected field is kept or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    Include,
    Exclude,
}

/// A single projection entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    pub field: String,
    pub inclusion: Inclusion,
}

impl FieldSelection {
    /// Parses `-field` (exclude) or `field` (include).
    pub fn parse(entry: &str) -> DocumentResult<Self> {
        let (field, inclusion) = match entry.strip_prefix('-') {
            Some(field) => (field, Inclusion::Exclude),
            None => (entry, Inclusion::Include),
        };

        Ok(Self {
            field: non_empty_field(field, FIELD_FIELDS)?,
            inclusion,
        })
    }
}

/// Everything a store needs to run one find.
///
/// Mixing included and excluded fields in `projection` is not checked here;
/// the store decides what it accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSpec {
    /// Filter document built from the non-control keys.
    pub filter: Document,
    /// Field projection, in declaration order.
    pub projection: Option<Vec<FieldSelection>>,
    /// Sort keys, primary key first.
    pub sort: Option<Vec<Sort>>,
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl SearchSpec {
    /// Creates a spec that only filters.
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// Whether a total count must be computed before fetching the page.
    pub fn counts_total(&self) -> bool {
        self.limit.is_some()
    }

    /// Renders the sort keys as a wire document (`1` ascending, `-1` descending).
    pub fn sort_document(&self) -> Option<Document> {
        self.sort.as_ref().map(|sort| {
            sort.iter()
                .map(|key| {
                    (
                        key.field.clone(),
                        match key.direction {
                            SortDirection::Asc => Bson::Int32(1),
                            SortDirection::Desc => Bson::Int32(-1),
                        },
                    )
                })
                .collect()
        })
    }

    /// Renders the projection as a wire document (`1` include, `0` exclude).
    pub fn projection_document(&self) -> Option<Document> {
        self.projection.as_ref().map(|fields| {
            fields
                .iter()
                .map(|selection| {
                    (
                        selection.field.clone(),
                        match selection.inclusion {
                            Inclusion::Include => Bson::Int32(1),
                            Inclusion::Exclude => Bson::Int32(0),
                        },
                    )
                })
                .collect()
        })
    }
}

/// Splits a search object into filter, projection, sort and pagination.
pub struct SearchTranslator;

impl SearchTranslator {
    /// Translates a search object without modifying it.
    ///
    /// # Errors
    ///
    /// - [`DocumentError::InvalidQuery`] when a control key holds a value of the wrong shape,
    ///   `$start` is negative or `$limit` is not positive
    /// - [`DocumentError::MalformedIdentifier`] when the remaining filter holds a bad `_id`
    pub fn translate(search: &Object) -> DocumentResult<SearchSpec> {
        let mut remaining = search.clone();

        let skip = match remaining.remove(FIELD_START) {
            None | Some(Value::Null) => None,
            Some(value) => Some(Self::count_value(FIELD_START, &value, 0)?),
        };

        let limit = match remaining.remove(FIELD_LIMIT) {
            None | Some(Value::Null) => None,
            Some(value) => Some(Self::count_value(FIELD_LIMIT, &value, 1)?),
        };

        let projection = match remaining.remove(FIELD_FIELDS) {
            None | Some(Value::Null) => None,
            Some(value) => Self::field_list(FIELD_FIELDS, &value)?
                .iter()
                .map(|entry| FieldSelection::parse(entry))
                .collect::<DocumentResult<Vec<_>>>()
                .map(|fields| Some(fields).filter(|fields| !fields.is_empty()))?,
        };

        let sort = match remaining.remove(FIELD_ORDER_BY) {
            None | Some(Value::Null) => None,
            Some(value) => Self::field_list(FIELD_ORDER_BY, &value)?
                .iter()
                .map(|entry| Sort::parse(entry))
                .collect::<DocumentResult<Vec<_>>>()
                .map(|keys| Some(keys).filter(|keys| !keys.is_empty()))?,
        };

        Ok(SearchSpec {
            filter: Converter::encode(&remaining)?,
            projection,
            sort,
            skip,
            limit,
        })
    }

    /// Builds a search matching a single identifier.
    pub fn by_id(id: impl Into<String>) -> Object {
        Object::new().with(ID_KEY, id.into())
    }

    /// Builds a search matching any of the given identifiers.
    pub fn by_ids(ids: Vec<String>) -> Object {
        Object::new().with(ID_KEY, Object::new().with("$in", ids))
    }

    fn count_value(key: &str, value: &Value, minimum: i64) -> DocumentResult<u64> {
        let count = match value {
            Value::Integer(v) => i64::from(*v),
            Value::Long(v) => *v,
            other => {
                return Err(DocumentError::InvalidQuery(format!(
                    "{key} must be an integer, got {other:?}"
                )));
            }
        };

        if count < minimum {
            return Err(DocumentError::InvalidQuery(format!(
                "{key} must be at least {minimum}, got {count}"
            )));
        }

        u64::try_from(count).map_err(|e| DocumentError::InvalidQuery(format!("{key}: {e}")))
    }

    fn field_list<'a>(key: &str, value: &'a Value) -> DocumentResult<&'a [String]> {
        match value {
            Value::StringArray(entries) => Ok(entries),
            other => Err(DocumentError::InvalidQuery(format!(
                "{key} must be an array of field names, got {other:?}"
            ))),
        }
    }
}

fn non_empty_field(field: &str, key: &str) -> DocumentResult<String> {
    if field.is_empty() {
        return Err(DocumentError::InvalidQuery(format!("{key} contains an empty field name")));
    }

    Ok(field.to_string())
}
