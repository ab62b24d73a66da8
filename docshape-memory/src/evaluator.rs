//! Filter evaluation for in-memory document matching.
//!
//! This module evaluates MongoDB-style filter documents against stored BSON
//! documents. Supported are implicit equality, the comparison operators
//! `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, the membership operators `$in`
//! and `$nin`, `$exists`, and the logical combinators `$and` and `$or`.
//! Field names may use dotted paths into nested documents.

use std::{collections::HashMap, cmp::Ordering};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docshape_core::error::{DocumentError, DocumentResult};


/// Type-erased, comparable representation of BSON values.
///
/// This enum wraps BSON values and provides comparison operations for
/// filtering and sorting. It normalizes numeric types to f64 for easy comparison.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null or missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// Object identifier
    ObjectId(ObjectId),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> From<Option<&'a Bson>> for Comparable<'a> {
    fn from(bson: Option<&'a Bson>) -> Self {
        bson.map(Comparable::from).unwrap_or(Comparable::Null)
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            // Missing values sort before everything else.
            (Comparable::Null, _) => Some(Ordering::Less),
            (_, Comparable::Null) => Some(Ordering::Greater),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Equality with array semantics: an array field matches a scalar it contains.
    fn matches(&self, expected: &Comparable<'a>) -> bool {
        match self {
            Comparable::Array(items) if !matches!(expected, Comparable::Array(_)) => {
                items.iter().any(|item| item == expected)
            }
            _ => self == expected,
        }
    }

    /// Ordering for range operators, where null never compares.
    fn ordering(&self, other: &Comparable<'a>) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, _) | (_, Comparable::Null) => None,
            _ => self.partial_cmp(other),
        }
    }
}

/// Resolves a dotted path such as `address.city` inside a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns `true` when the document satisfies every clause of `filter`.
    pub fn evaluate(&self, filter: &Document) -> DocumentResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in Self::clauses(key, condition)? {
                        if !self.evaluate(clause)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                "$or" => {
                    let mut any = false;
                    for clause in Self::clauses(key, condition)? {
                        if self.evaluate(clause)? {
                            any = true;
                            break;
                        }
                    }
                    any
                }
                op if op.starts_with('$') => {
                    return Err(DocumentError::Backend(format!("unsupported operator {op}")));
                }
                field => self.evaluate_field(field, condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> DocumentResult<Vec<&'a Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    fn clauses<'f>(key: &str, condition: &'f Bson) -> DocumentResult<Vec<&'f Document>> {
        condition
            .as_array()
            .ok_or_else(|| DocumentError::Backend(format!("{key} requires an array")))?
            .iter()
            .map(|clause| {
                clause
                    .as_document()
                    .ok_or_else(|| DocumentError::Backend(format!("{key} clauses must be documents")))
            })
            .collect()
    }

    fn evaluate_field(&self, field: &str, condition: &Bson) -> DocumentResult<bool> {
        let stored = lookup(self.document, field);

        match condition {
            Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
                for (op, operand) in ops {
                    if !Self::apply_operator(stored, op, operand)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            expected => Ok(Comparable::from(stored).matches(&Comparable::from(expected))),
        }
    }

    fn apply_operator(stored: Option<&Bson>, op: &str, operand: &Bson) -> DocumentResult<bool> {
        let value = Comparable::from(stored);
        let expected = Comparable::from(operand);

        Ok(match op {
            "$eq" => value.matches(&expected),
            "$ne" => !value.matches(&expected),
            "$gt" | "$gte" | "$lt" | "$lte" => match stored {
                None => false,
                Some(_) => match value.ordering(&expected) {
                    Some(ordering) => match op {
                        "$gt" => ordering == Ordering::Greater,
                        "$gte" => ordering != Ordering::Less,
                        "$lt" => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                },
            },
            "$in" | "$nin" => {
                let candidates = operand
                    .as_array()
                    .ok_or_else(|| DocumentError::Backend(format!("{op} requires an array")))?;
                let found = candidates
                    .iter()
                    .any(|candidate| value.matches(&Comparable::from(candidate)));

                if op == "$in" { found } else { !found }
            }
            "$exists" => {
                let should_exist = operand.as_bool().unwrap_or(true);
                stored.is_some() == should_exist
            }
            other => return Err(DocumentError::Backend(format!("unsupported operator {other}"))),
        })
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn matches(document: &Document, filter: &Document) -> bool {
        DocumentEvaluator::new(document).evaluate(filter).unwrap()
    }

    #[test]
    fn test_implicit_equality() {
        let document = doc! { "name": "Alice", "age": 30 };

        assert!(matches(&document, &doc! { "name": "Alice" }));
        assert!(matches(&document, &doc! { "age": 30.0 }));
        assert!(!matches(&document, &doc! { "name": "Bob" }));
        assert!(matches(&document, &doc! {}));
    }

    #[test]
    fn test_array_contains_scalar() {
        let document = doc! { "tags": ["a", "b"] };

        assert!(matches(&document, &doc! { "tags": "b" }));
        assert!(matches(&document, &doc! { "tags": ["a", "b"] }));
        assert!(!matches(&document, &doc! { "tags": ["b", "a"] }));
    }

    #[test]
    fn test_comparison_operators() {
        let document = doc! { "age": 30 };

        assert!(matches(&document, &doc! { "age": { "$gt": 20, "$lte": 30 } }));
        assert!(!matches(&document, &doc! { "age": { "$lt": 30 } }));
        assert!(matches(&document, &doc! { "age": { "$ne": 31 } }));
        assert!(!matches(&document, &doc! { "missing": { "$gte": 0 } }));
    }

    #[test]
    fn test_membership_and_existence() {
        let id = ObjectId::new();
        let document = doc! { "_id": id, "status": "new" };

        assert!(matches(&document, &doc! { "_id": { "$in": [ObjectId::new(), id] } }));
        assert!(matches(&document, &doc! { "status": { "$nin": ["done"] } }));
        assert!(matches(&document, &doc! { "status": { "$exists": true } }));
        assert!(matches(&document, &doc! { "owner": { "$exists": false } }));
    }

    #[test]
    fn test_logical_and_dotted_paths() {
        let document = doc! { "address": { "city": "Oslo" }, "age": 40 };

        assert!(matches(&document, &doc! { "address.city": "Oslo" }));
        assert!(matches(&document, &doc! { "$or": [{ "age": 1 }, { "address.city": "Oslo" }] }));
        assert!(!matches(&document, &doc! { "$and": [{ "age": 40 }, { "address.city": "Rome" }] }));
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        let result = DocumentEvaluator::new(&doc! { "a": 1 }).evaluate(&doc! { "a": { "$regex": "x" } });

        assert!(matches!(result, Err(DocumentError::Backend(_))));
    }

    #[test]
    fn test_missing_values_sort_first() {
        let value = Bson::Int32(1);

        assert_eq!(
            Comparable::from(None::<&Bson>).partial_cmp(&Comparable::from(Some(&value))),
            Some(Ordering::Less)
        );
    }
}
