//! Document-model CRUD on top of a [`StoreGateway`].
//!
//! [`DocumentManager`] is the entry point callers use: it takes and returns
//! [`Object`]s, runs search objects through the [`SearchTranslator`], encodes
//! payloads with the [`Converter`] and decodes every row the store hands back.
//!
//! Result objects always carry the rows under `root`. A find that asked for a
//! `$limit` additionally carries the number of matching documents under `total`.
//!
//! # Example
//!
//! ```ignore
//! use docshape::{prelude::*, memory::InMemoryGateway};
//!
//! let manager = DocumentManager::new(InMemoryGateway::new());
//!
//! manager.insert("users", &Object::new().with("name", "Alice")).await?;
//!
//! let page = manager
//!     .find("users", &Object::new().with("$limit", 10).with("$orderBy", vec!["-name"]))
//!     .await?;
//! ```

use tracing::debug;

use crate::{
    collection::Collection,
    convert::Converter,
    error::DocumentResult,
    gateway::StoreGateway,
    object::{Object, Value},
    search::{FIELD_ROOT, FIELD_TOTAL, SearchTranslator},
};

/// Runs document-model operations against a single shared gateway.
#[derive(Debug)]
pub struct DocumentManager<G: StoreGateway> {
    gateway: G,
}

impl<G: StoreGateway> DocumentManager<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Binds a collection name to this manager.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, G> {
        Collection::new(name.to_string(), self)
    }

    /// Finds documents matching a search object.
    ///
    /// Control keys are stripped from a copy of `search`; the caller's object is
    /// left as is. When `$limit` is present the matching documents are counted
    /// first, against the filter alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the search object is invalid or the store fails.
    pub async fn find(&self, collection: &str, search: &Object) -> DocumentResult<Object> {
        let spec = SearchTranslator::translate(search)?;

        debug!(
            collection,
            filter = %spec.filter,
            skip = ?spec.skip,
            limit = ?spec.limit,
            "find"
        );

        let mut response = Object::new();

        if spec.counts_total() {
            let total = self.gateway
                .count_matching(collection, &spec.filter)
                .await?;

            response.insert(FIELD_TOTAL, i64::try_from(total).unwrap_or(i64::MAX));
        }

        let rows = self.gateway
            .find(collection, &spec)
            .await?;

        response.insert(FIELD_ROOT, Converter::decode_many(&rows));

        Ok(response)
    }

    /// Inserts a payload and returns the stored rows as read back from the store.
    ///
    /// A payload whose `root` key holds an array of objects is a batch: every
    /// element is inserted and all of them are read back by their new identifiers.
    /// Any other payload is inserted as a single document.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the store rejects the write.
    pub async fn insert(&self, collection: &str, payload: &Object) -> DocumentResult<Object> {
        match payload.get(FIELD_ROOT) {
            Some(Value::ObjectArray(rows)) => {
                if rows.is_empty() {
                    return Ok(Object::new().with(FIELD_ROOT, Vec::<Object>::new()));
                }

                let documents = Converter::encode_many(rows)?;

                debug!(collection, count = documents.len(), "insert many");

                let ids = self.gateway
                    .insert_many(collection, documents)
                    .await?;

                self.find(
                    collection,
                    &SearchTranslator::by_ids(ids.iter().map(|id| id.to_hex()).collect()),
                )
                .await
            }
            _ => {
                let document = Converter::encode(payload)?;

                debug!(collection, "insert one");

                let id = self.gateway
                    .insert_one(collection, document)
                    .await?;

                self.find(collection, &SearchTranslator::by_id(id.to_hex()))
                    .await
            }
        }
    }

    /// Applies `payload` to the documents matching `filter` and reads them back.
    ///
    /// `payload` is an update-operator object such as `{"$set": {...}}`; see
    /// [`StoreGateway::update_one`].
    ///
    /// The filter is encoded as given, without control-key handling. The read-back
    /// reuses the same filter, so documents the update moved out of it are not
    /// part of the result.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the store rejects the write.
    pub async fn update(
        &self,
        collection: &str,
        filter: &Object,
        payload: &Object,
        multiple: bool,
    ) -> DocumentResult<Object> {
        let filter_document = Converter::encode(filter)?;
        let update = Converter::encode(payload)?;

        let matched = if multiple {
            self.gateway
                .update_many(collection, filter_document, update)
                .await?
        } else {
            self.gateway
                .update_one(collection, filter_document, update)
                .await?
        };

        debug!(collection, matched, multiple, "update");

        self.find(collection, filter).await
    }

    /// Deletes the first (or every, when `multiple`) document matching `filter`.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete(&self, collection: &str, filter: &Object, multiple: bool) -> DocumentResult<u64> {
        let filter_document = Converter::encode(filter)?;

        let deleted = if multiple {
            self.gateway
                .delete_many(collection, filter_document)
                .await?
        } else {
            self.gateway
                .delete_one(collection, filter_document)
                .await?
        };

        debug!(collection, deleted, multiple, "delete");

        Ok(deleted)
    }

    /// Shuts down the underlying gateway.
    pub async fn shutdown(self) -> DocumentResult<()> {
        self.gateway.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bson::{Document, doc, oid::ObjectId};

    use super::*;
    use crate::{
        error::DocumentError,
        search::{SearchSpec, Sort, SortDirection},
    };

    const HEX: &str = "507f1f77bcf86cd799439011";
    const OTHER_HEX: &str = "507f191e810c19729de860ea";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        InsertOne(Document),
        InsertMany(Vec<Document>),
        Find(SearchSpec),
        Count(Document),
        UpdateOne(Document, Document),
        UpdateMany(Document, Document),
        DeleteOne(Document),
        DeleteMany(Document),
    }

    /// Records every call and answers with canned rows.
    #[derive(Debug, Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<(String, Call)>>,
        rows: Vec<Document>,
        total: u64,
        fail: bool,
    }

    impl RecordingGateway {
        fn with_rows(rows: Vec<Document>) -> Self {
            Self { rows, ..Default::default() }
        }

        fn record(&self, collection: &str, call: Call) -> Result<(), DocumentError> {
            self.calls
                .lock()
                .unwrap()
                .push((collection.to_string(), call));

            if self.fail {
                return Err(DocumentError::Backend("connection reset".into()));
            }

            Ok(())
        }

        fn calls(&self) -> Vec<Call> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, call)| call.clone())
                .collect()
        }
    }

    #[async_trait]
    impl StoreGateway for RecordingGateway {
        async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<ObjectId> {
            self.record(collection, Call::InsertOne(document))?;
            Ok(ObjectId::parse_str(HEX).unwrap())
        }

        async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DocumentResult<Vec<ObjectId>> {
            self.record(collection, Call::InsertMany(documents))?;
            Ok(vec![ObjectId::parse_str(HEX).unwrap(), ObjectId::parse_str(OTHER_HEX).unwrap()])
        }

        async fn find(&self, collection: &str, spec: &SearchSpec) -> DocumentResult<Vec<Document>> {
            self.record(collection, Call::Find(spec.clone()))?;
            Ok(self.rows.clone())
        }

        async fn count_matching(&self, collection: &str, filter: &Document) -> DocumentResult<u64> {
            self.record(collection, Call::Count(filter.clone()))?;
            Ok(self.total)
        }

        async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentResult<u64> {
            self.record(collection, Call::UpdateOne(filter, update))?;
            Ok(1)
        }

        async fn update_many(&self, collection: &str, filter: Document, update: Document) -> DocumentResult<u64> {
            self.record(collection, Call::UpdateMany(filter, update))?;
            Ok(2)
        }

        async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
            self.record(collection, Call::DeleteOne(filter))?;
            Ok(1)
        }

        async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
            self.record(collection, Call::DeleteMany(filter))?;
            Ok(3)
        }
    }

    fn oid(hex: &str) -> ObjectId {
        ObjectId::parse_str(hex).unwrap()
    }

    #[tokio::test]
    async fn test_find_counts_then_fetches_page() {
        let gateway = RecordingGateway {
            total: 42,
            ..RecordingGateway::with_rows(vec![doc! { "_id": oid(HEX), "name": "a", "age": 30 }])
        };
        let manager = DocumentManager::new(gateway);
        let search = Object::new()
            .with("name", "a")
            .with("$limit", 10)
            .with("$start", 5)
            .with("$orderBy", vec!["-age", "name"]);

        let result = manager.find("users", &search).await.unwrap();

        let calls = manager.gateway().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], Call::Count(doc! { "name": "a" }));
        match &calls[1] {
            Call::Find(spec) => {
                assert_eq!(spec.filter, doc! { "name": "a" });
                assert_eq!(spec.skip, Some(5));
                assert_eq!(spec.limit, Some(10));
                assert_eq!(
                    spec.sort,
                    Some(vec![
                        Sort { field: "age".into(), direction: SortDirection::Desc },
                        Sort { field: "name".into(), direction: SortDirection::Asc },
                    ])
                );
            }
            other => panic!("unexpected call {other:?}"),
        }

        assert_eq!(result.get_long("total"), Some(42));
        assert_eq!(
            result.get_object_array("root"),
            Some(&[Object::new().with("_id", HEX).with("name", "a").with("age", 30)][..])
        );
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["total", "root"]);
    }

    #[tokio::test]
    async fn test_find_without_limit_skips_count() {
        let manager = DocumentManager::new(RecordingGateway::default());

        let result = manager
            .find("users", &Object::new().with("$start", 5))
            .await
            .unwrap();

        assert_eq!(manager.gateway().calls(), vec![Call::Find(SearchSpec {
            skip: Some(5),
            ..SearchSpec::default()
        })]);
        assert!(!result.contains_key("total"));
        assert_eq!(result.get_object_array("root"), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_find_leaves_search_untouched() {
        let manager = DocumentManager::new(RecordingGateway::default());
        let search = Object::new()
            .with("$limit", 3)
            .with("$fields", vec!["-password"]);
        let before = search.clone();

        manager.find("users", &search).await.unwrap();

        assert_eq!(search, before);
    }

    #[tokio::test]
    async fn test_insert_one_reads_back_by_new_id() {
        let manager = DocumentManager::new(RecordingGateway::with_rows(vec![
            doc! { "_id": oid(HEX), "name": "Alice" },
        ]));

        let result = manager
            .insert("users", &Object::new().with("name", "Alice"))
            .await
            .unwrap();

        assert_eq!(manager.gateway().calls(), vec![
            Call::InsertOne(doc! { "name": "Alice" }),
            Call::Find(SearchSpec::new(doc! { "_id": oid(HEX) })),
        ]);
        assert_eq!(
            result.get_object_array("root").unwrap()[0].get_str("_id"),
            Some(HEX)
        );
    }

    #[tokio::test]
    async fn test_batch_insert_reads_back_by_in_query() {
        let manager = DocumentManager::new(RecordingGateway::default());
        let payload = Object::new().with("root", vec![
            Object::new().with("name", "a"),
            Object::new().with("name", "b"),
        ]);

        manager.insert("users", &payload).await.unwrap();

        assert_eq!(manager.gateway().calls(), vec![
            Call::InsertMany(vec![doc! { "name": "a" }, doc! { "name": "b" }]),
            Call::Find(SearchSpec::new(doc! { "_id": { "$in": [oid(HEX), oid(OTHER_HEX)] } })),
        ]);
    }

    #[tokio::test]
    async fn test_empty_batch_insert_does_nothing() {
        let manager = DocumentManager::new(RecordingGateway::default());

        let result = manager
            .insert("users", &Object::new().with("root", Vec::<Object>::new()))
            .await
            .unwrap();

        assert!(manager.gateway().calls().is_empty());
        assert_eq!(result.get_object_array("root"), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_root_that_is_not_a_row_list_is_a_single_insert() {
        let manager = DocumentManager::new(RecordingGateway::default());

        manager
            .insert("users", &Object::new().with("root", "plain"))
            .await
            .unwrap();

        assert_eq!(
            manager.gateway().calls()[0],
            Call::InsertOne(doc! { "root": "plain" })
        );
    }

    #[tokio::test]
    async fn test_update_reads_back_with_original_filter() {
        let manager = DocumentManager::new(RecordingGateway::default());
        let filter = Object::new().with("status", "new");
        let payload = Object::new().with("$set", Object::new().with("status", "done"));

        manager.update("tasks", &filter, &payload, true).await.unwrap();
        manager.update("tasks", &filter, &payload, false).await.unwrap();

        assert_eq!(manager.gateway().calls(), vec![
            Call::UpdateMany(doc! { "status": "new" }, doc! { "$set": { "status": "done" } }),
            Call::Find(SearchSpec::new(doc! { "status": "new" })),
            Call::UpdateOne(doc! { "status": "new" }, doc! { "$set": { "status": "done" } }),
            Call::Find(SearchSpec::new(doc! { "status": "new" })),
        ]);
    }

    #[tokio::test]
    async fn test_delete_one_and_many() {
        let manager = DocumentManager::new(RecordingGateway::default());
        let filter = Object::new().with("_id", HEX);

        assert_eq!(manager.delete("users", &filter, false).await.unwrap(), 1);
        assert_eq!(manager.delete("users", &filter, true).await.unwrap(), 3);
        assert_eq!(manager.gateway().calls(), vec![
            Call::DeleteOne(doc! { "_id": oid(HEX) }),
            Call::DeleteMany(doc! { "_id": oid(HEX) }),
        ]);
    }

    #[tokio::test]
    async fn test_malformed_id_never_reaches_store() {
        let manager = DocumentManager::new(RecordingGateway::default());

        let result = manager
            .delete("users", &Object::new().with("_id", "nope"), true)
            .await;

        assert!(matches!(result, Err(DocumentError::MalformedIdentifier(_))));
        assert!(manager.gateway().calls().is_empty());
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let manager = DocumentManager::new(RecordingGateway {
            fail: true,
            ..Default::default()
        });

        let result = manager
            .find("users", &Object::new().with("$limit", 1))
            .await;

        assert!(matches!(result, Err(DocumentError::Backend(_))));
        assert_eq!(manager.gateway().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_collection_forwards_name() {
        let manager = DocumentManager::new(RecordingGateway::default());
        let users = manager.collection("users");

        users.find(&Object::new()).await.unwrap();
        users.delete(&Object::new(), true).await.unwrap();

        let names = manager
            .gateway()
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();
        assert_eq!(users.name(), "users");
        assert_eq!(names, vec!["users", "users"]);
    }
}
