//! Store gateway abstraction.
//!
//! A [`StoreGateway`] is the thin boundary to an actual document store. It only
//! moves wire documents: every operation takes and returns BSON that was already
//! produced (or will be consumed) by the [`Converter`](crate::convert::Converter).
//! Connection management, pooling, retries and timeouts are the implementer's
//! concern.
//!
//! # Traits
//!
//! - [`StoreGateway`]: The operations a store must expose
//! - [`GatewayBuilder`]: Factory trait for creating gateway instances
//!
//! # Examples
//!
//! ```ignore
//! use docshape::gateway::StoreGateway;
//! use bson::doc;
//!
//! let gateway = MyGatewayImpl::new();
//!
//! let id = gateway.insert_one("users", doc! { "name": "Alice", "age": 30 }).await?;
//! let count = gateway.count_matching("users", &doc! { "age": 30 }).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{error::DocumentResult, search::SearchSpec};

/// Abstract interface over a document store collection API.
///
/// # Thread Safety
///
/// Implementations must be safe to share between tasks. A single long-lived
/// handle is expected to be reused for every call.
///
/// # Error Handling
///
/// Store failures are reported as [`DocumentError::Backend`](crate::error::DocumentError::Backend)
/// and are never retried by callers in this crate.
#[async_trait]
pub trait StoreGateway: Send + Sync + Debug {
    /// Inserts one document and returns the identifier the store assigned to it.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<ObjectId>;

    /// Inserts documents in order and returns their identifiers in the same order.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentResult<Vec<ObjectId>>;

    /// Runs a find with the filter, projection, sort, skip and limit of `spec`.
    ///
    /// The sort is applied before skip and limit so pages are stable.
    async fn find(&self, collection: &str, spec: &SearchSpec) -> DocumentResult<Vec<Document>>;

    /// Counts the documents matching `filter`, ignoring any pagination.
    async fn count_matching(&self, collection: &str, filter: &Document) -> DocumentResult<u64>;

    /// Applies `update` to the first document matching `filter`. Returns the number of documents matched.
    ///
    /// `update` must consist of update operators such as `$set`; documents
    /// holding plain fields are rejected with
    /// [`DocumentError::Backend`](crate::error::DocumentError::Backend) rather
    /// than treated as a replacement.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentResult<u64>;

    /// Applies `update` to every document matching `filter`. Returns the number of documents matched.
    ///
    /// Same contract for `update` as [`StoreGateway::update_one`].
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentResult<u64>;

    /// Deletes the first document matching `filter`. Returns the number of documents deleted.
    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64>;

    /// Deletes every document matching `filter`. Returns the number of documents deleted.
    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64>;

    /// Cleanly shuts down the gateway, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<G> StoreGateway for &G
where
    G: StoreGateway,
{
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<ObjectId> {
        (*self).insert_one(collection, document).await
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentResult<Vec<ObjectId>> {
        (*self).insert_many(collection, documents).await
    }

    async fn find(&self, collection: &str, spec: &SearchSpec) -> DocumentResult<Vec<Document>> {
        (*self).find(collection, spec).await
    }

    async fn count_matching(&self, collection: &str, filter: &Document) -> DocumentResult<u64> {
        (*self).count_matching(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentResult<u64> {
        (*self)
            .update_one(collection, filter, update)
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentResult<u64> {
        (*self)
            .update_many(collection, filter, update)
            .await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        (*self).delete_one(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        (*self).delete_many(collection, filter).await
    }
}

#[async_trait]
pub trait GatewayBuilder {
    type Gateway: StoreGateway;

    async fn build(self) -> DocumentResult<Self::Gateway>;
}
