//! Collection handles bound to a [`DocumentManager`].
//!
//! A [`Collection`] saves repeating the collection name on every call.
//!
//! # Example
//!
//! ```ignore
//! use docshape::{prelude::*, memory::InMemoryGateway};
//!
//! let manager = DocumentManager::new(InMemoryGateway::new());
//! let users = manager.collection("users");
//!
//! users.insert(&Object::new().with("name", "Alice")).await?;
//! let alices = users.find(&Object::new().with("name", "Alice")).await?;
//! ```

use crate::{
    error::DocumentResult,
    gateway::StoreGateway,
    manager::DocumentManager,
    object::Object,
};

/// A named collection with a reference to a manager.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the manager reference
/// * `G` - The store gateway type
#[derive(Debug)]
pub struct Collection<'a, G: StoreGateway> {
    name: String,
    manager: &'a DocumentManager<G>,
}

impl<'a, G: StoreGateway> Collection<'a, G> {
    pub(crate) fn new(name: String, manager: &'a DocumentManager<G>) -> Self {
        Self { name, manager }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// See [`DocumentManager::find`].
    pub async fn find(&self, search: &Object) -> DocumentResult<Object> {
        self.manager
            .find(&self.name, search)
            .await
    }

    /// See [`DocumentManager::insert`].
    pub async fn insert(&self, payload: &Object) -> DocumentResult<Object> {
        self.manager
            .insert(&self.name, payload)
            .await
    }

    /// See [`DocumentManager::update`].
    pub async fn update(&self, filter: &Object, payload: &Object, multiple: bool) -> DocumentResult<Object> {
        self.manager
            .update(&self.name, filter, payload, multiple)
            .await
    }

    /// Updates every document matching `filter`.
    pub async fn update_many(&self, filter: &Object, payload: &Object) -> DocumentResult<Object> {
        self.update(filter, payload, true).await
    }

    /// See [`DocumentManager::delete`].
    pub async fn delete(&self, filter: &Object, multiple: bool) -> DocumentResult<u64> {
        self.manager
            .delete(&self.name, filter, multiple)
            .await
    }

    /// Deletes every document matching `filter`.
    pub async fn delete_many(&self, filter: &Object) -> DocumentResult<u64> {
        self.delete(filter, true).await
    }
}
