//! In-memory gateway implementation.
//!
//! This module provides a simple in-memory store that keeps wire documents per
//! collection in insertion order, behind an async-safe read-write lock.

use std::{collections::HashMap, sync::Arc, cmp::Ordering};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};
use tracing::debug;

use docshape_core::{
    convert::ID_KEY,
    error::{DocumentError, DocumentResult},
    gateway::{GatewayBuilder, StoreGateway},
    search::{FieldSelection, Inclusion, SearchSpec, Sort, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type StoreMap = HashMap<String, Vec<Document>>;


/// Thread-safe in-memory store gateway.
///
/// Documents are kept as BSON in insertion order, which is also the order a
/// find without sort keys returns them in. Every inserted document receives a
/// fresh object identifier under `_id` unless it already carries one.
///
/// # Thread Safety
///
/// `InMemoryGateway` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Every find, count, update and delete scans the whole collection.
///
/// # Example
///
/// ```ignore
/// use docshape_memory::InMemoryGateway;
/// use docshape::gateway::StoreGateway;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let gateway = InMemoryGateway::new();
///
///     let id = gateway.insert_one("users", doc! { "name": "Alice" }).await?;
///     let count = gateway.count_matching("users", &doc! { "_id": id }).await?;
///     assert_eq!(count, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryGateway {
    /// collection_name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryGateway {
    /// Creates a new empty in-memory gateway.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryGateway`.
    pub fn builder() -> InMemoryGatewayBuilder {
        InMemoryGatewayBuilder
    }

    /// Puts `_id` first, assigning a new identifier when the document has none.
    fn assign_id(document: Document) -> DocumentResult<(ObjectId, Document)> {
        let id = match document.get(ID_KEY) {
            None => ObjectId::new(),
            Some(Bson::ObjectId(id)) => *id,
            Some(other) => {
                return Err(DocumentError::Conversion(format!(
                    "document identifier must be an object id, got {other}"
                )));
            }
        };

        let mut stored = Document::new();
        stored.insert(ID_KEY, id);

        for (key, value) in document {
            if key != ID_KEY {
                stored.insert(key, value);
            }
        }

        Ok((id, stored))
    }

    fn insert_into(documents: &mut Vec<Document>, document: Document, collection: &str) -> DocumentResult<ObjectId> {
        let (id, stored) = Self::assign_id(document)?;

        if documents.iter().any(|existing| existing.get_object_id(ID_KEY).ok() == Some(id)) {
            return Err(DocumentError::Backend(format!(
                "duplicate key {id} in collection {collection}"
            )));
        }

        documents.push(stored);

        Ok(id)
    }

    fn matching_positions(documents: &[Document], filter: &Document, multiple: bool) -> DocumentResult<Vec<usize>> {
        let mut positions = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                positions.push(position);

                if !multiple {
                    break;
                }
            }
        }

        Ok(positions)
    }

    fn compare(left: &Document, right: &Document, sort: &[Sort]) -> Ordering {
        for key in sort {
            let ordering = Comparable::from(lookup(left, &key.field))
                .partial_cmp(&Comparable::from(lookup(right, &key.field)))
                .unwrap_or(Ordering::Equal);

            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }

    /// Applies include/exclude selections to a top-level document.
    ///
    /// Any included field other than `_id`, or `_id` as the only selection,
    /// switches to inclusion mode. `_id` is kept unless excluded explicitly.
    /// Excluding other fields while including some is rejected, as document
    /// stores do.
    fn project(document: &Document, fields: &[FieldSelection]) -> DocumentResult<Document> {
        let includes = |selection: &FieldSelection| selection.inclusion == Inclusion::Include;
        let including = fields.iter().any(|selection| includes(selection) && selection.field != ID_KEY)
            || (!fields.is_empty() && fields.iter().all(|selection| includes(selection) && selection.field == ID_KEY));
        let keep_id = !fields
            .iter()
            .any(|selection| !includes(selection) && selection.field == ID_KEY);

        if including {
            if fields.iter().any(|selection| !includes(selection) && selection.field != ID_KEY) {
                return Err(DocumentError::Backend("cannot mix inclusion and exclusion in a projection".into()));
            }

            return Ok(document
                .iter()
                .filter(|(key, _)| {
                    (key.as_str() == ID_KEY && keep_id)
                        || fields.iter().any(|selection| includes(selection) && &selection.field == *key)
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect());
        }

        Ok(document
            .iter()
            .filter(|(key, _)| {
                !fields.iter().any(|selection| !includes(selection) && &selection.field == *key)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn check_update(update: &Document) -> DocumentResult<()> {
        if update.is_empty() || update.keys().any(|key| !key.starts_with('$')) {
            return Err(DocumentError::Backend("update document must only contain update operators".into()));
        }

        Ok(())
    }

    /// Computes the result of applying `$set`, `$unset` and `$inc` to `document`.
    ///
    /// The stored document is left untouched; a failing operator aborts the
    /// whole update. Documents without operators are rejected, as MongoDB does.
    fn apply_update(document: &Document, update: &Document) -> DocumentResult<Document> {
        let mut updated = document.clone();

        for (op, fields) in update {
            let fields = fields
                .as_document()
                .ok_or_else(|| DocumentError::Backend(format!("{op} requires a document")))?;

            for (field, value) in fields {
                if field == ID_KEY {
                    return Err(DocumentError::Backend(format!("{op} cannot modify {ID_KEY}")));
                }

                match op.as_str() {
                    "$set" => {
                        updated.insert(field.clone(), value.clone());
                    }
                    "$unset" => {
                        updated.remove(field);
                    }
                    "$inc" => {
                        let incremented = increment(updated.get(field), value)
                            .ok_or_else(|| DocumentError::Backend(format!("cannot increment field {field} by {value}")))?;

                        updated.insert(field.clone(), incremented);
                    }
                    other => return Err(DocumentError::Backend(format!("unsupported update operator {other}"))),
                }
            }
        }

        Ok(updated)
    }
}

/// Adds `delta` to `current`, returning `None` for non-numeric operands or integer overflow.
fn increment(current: Option<&Bson>, delta: &Bson) -> Option<Bson> {
    Some(match (current, delta) {
        (None, delta) => {
            numeric(delta)?;
            delta.clone()
        }
        (Some(Bson::Int32(a)), Bson::Int32(b)) => Bson::Int32(a.checked_add(*b)?),
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b)?),
        (Some(Bson::Int32(a)), Bson::Int64(b)) => Bson::Int64(i64::from(*a).checked_add(*b)?),
        (Some(Bson::Int64(a)), Bson::Int32(b)) => Bson::Int64(a.checked_add(i64::from(*b))?),
        (Some(current), delta) => Bson::Double(numeric(current)? + numeric(delta)?),
    })
}

/// Numeric widening used by `$inc`.
fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}


#[async_trait]
impl StoreGateway for InMemoryGateway {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<ObjectId> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        debug!(collection, "memory insert one");

        Self::insert_into(documents, document, collection)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DocumentResult<Vec<ObjectId>> {
        let mut store = self.store.write().await;
        let stored = store
            .entry(collection.to_string())
            .or_default();

        debug!(collection, count = documents.len(), "memory insert many");

        documents
            .into_iter()
            .map(|document| Self::insert_into(stored, document, collection))
            .collect()
    }

    async fn find(&self, collection: &str, spec: &SearchSpec) -> DocumentResult<Vec<Document>> {
        let store = self.store.read().await;
        let documents = match store.get(collection) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        let mut matched = DocumentEvaluator::filter_documents(documents, &spec.filter)?;

        // Sort before paginating so pages are stable
        if let Some(sort) = &spec.sort {
            matched.sort_by(|a, b| Self::compare(a, b, sort));
        }

        let page = matched
            .into_iter()
            .skip(spec.skip.unwrap_or(0) as usize)
            .take(spec.limit.map(|limit| limit as usize).unwrap_or(usize::MAX));

        match &spec.projection {
            Some(fields) => page
                .map(|document| Self::project(document, fields))
                .collect(),
            None => Ok(page.cloned().collect()),
        }
    }

    async fn count_matching(&self, collection: &str, filter: &Document) -> DocumentResult<u64> {
        let store = self.store.read().await;

        Ok(match store.get(collection) {
            Some(documents) => DocumentEvaluator::filter_documents(documents, filter)?.len() as u64,
            None => 0,
        })
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentResult<u64> {
        self.update(collection, &filter, &update, false).await
    }

    async fn update_many(&self, collection: &str, filter: Document, update: Document) -> DocumentResult<u64> {
        self.update(collection, &filter, &update, true).await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        self.delete(collection, &filter, false).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        self.delete(collection, &filter, true).await
    }
}

impl InMemoryGateway {
    async fn update(&self, collection: &str, filter: &Document, update: &Document, multiple: bool) -> DocumentResult<u64> {
        Self::check_update(update)?;

        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(0),
        };

        let positions = Self::matching_positions(documents, filter, multiple)?;

        // Every matched document is updated before any of them is written back
        let updated = positions
            .iter()
            .map(|&position| Self::apply_update(&documents[position], update))
            .collect::<DocumentResult<Vec<_>>>()?;

        for (&position, document) in positions.iter().zip(updated) {
            documents[position] = document;
        }

        debug!(collection, matched = positions.len(), "memory update");

        Ok(positions.len() as u64)
    }

    async fn delete(&self, collection: &str, filter: &Document, multiple: bool) -> DocumentResult<u64> {
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(0),
        };

        let positions = Self::matching_positions(documents, filter, multiple)?;

        // Highest position first so earlier removals do not shift later ones
        for &position in positions.iter().rev() {
            documents.remove(position);
        }

        debug!(collection, deleted = positions.len(), "memory delete");

        Ok(positions.len() as u64)
    }
}


/// Builder for constructing [`InMemoryGateway`] instances.
///
/// # Example
///
/// ```ignore
/// use docshape_memory::InMemoryGateway;
/// use docshape::gateway::GatewayBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let gateway = InMemoryGateway::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryGatewayBuilder;

#[async_trait]
impl GatewayBuilder for InMemoryGatewayBuilder {
    type Gateway = InMemoryGateway;

    async fn build(self) -> DocumentResult<Self::Gateway> {
        Ok(InMemoryGateway::new())
    }
}
