use std::env;
use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, oid::ObjectId};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions, ServerApi, ServerApiVersion},
};
use tracing::debug;
use docshape_core::{
    error::{DocumentError, DocumentResult},
    gateway::{GatewayBuilder, StoreGateway},
    search::SearchSpec,
};

/// Environment variable holding the connection string read by [`MongoGatewayBuilder::from_env`].
pub const ENV_URL: &str = "MONGO_URL";
/// Environment variable holding the database name read by [`MongoGatewayBuilder::from_env`].
pub const ENV_DB: &str = "MONGO_DB";


/// Store gateway backed by a MongoDB database.
///
/// Collections are resolved per call from a single long-lived [`Client`], which
/// pools its own connections. Searches run entirely on the server; driver
/// failures surface as [`DocumentError::Backend`] with the driver's message.
///
/// Update documents are handed to the driver unchanged, so they must consist of
/// update operators.
#[derive(Debug)]
pub struct MongoGateway {
    client: Client,
    database: String,
}

impl MongoGateway {
    /// Wraps an already configured client.
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    /// Creates a builder connecting to `dsn` and using `database`.
    pub fn builder(dsn: &str, database: &str) -> MongoGatewayBuilder {
        MongoGatewayBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn object_id(id: &Bson) -> DocumentResult<ObjectId> {
        id.as_object_id()
            .ok_or_else(|| DocumentError::Conversion(format!("store assigned a non object id identifier {id}")))
    }
}

/// Maps the pagination, sort and projection of a search onto driver options.
pub(crate) fn find_options(spec: &SearchSpec) -> FindOptions {
    let mut options = FindOptions::default();

    if let Some(limit) = spec.limit {
        options.limit = Some(limit as i64);
    }
    if let Some(skip) = spec.skip {
        options.skip = Some(skip);
    }
    options.sort = spec.sort_document();
    options.projection = spec.projection_document();

    options
}

fn backend(error: mongodb::error::Error) -> DocumentError {
    DocumentError::Backend(error.to_string())
}

#[async_trait]
impl StoreGateway for MongoGateway {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentResult<ObjectId> {
        debug!(collection, "mongodb insert one");

        let result = self.get_collection(collection)
            .insert_one(document)
            .await
            .map_err(backend)?;

        Self::object_id(&result.inserted_id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> DocumentResult<Vec<ObjectId>> {
        debug!(collection, count = documents.len(), "mongodb insert many");

        let result = self.get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(backend)?;

        let mut inserted = result.inserted_ids
            .into_iter()
            .collect::<Vec<(usize, Bson)>>();
        inserted.sort_by_key(|(index, _)| *index);

        inserted
            .iter()
            .map(|(_, id)| Self::object_id(id))
            .collect()
    }

    async fn find(&self, collection: &str, spec: &SearchSpec) -> DocumentResult<Vec<Document>> {
        debug!(collection, filter = %spec.filter, "mongodb find");

        self.get_collection(collection)
            .find(spec.filter.clone())
            .with_options(find_options(spec))
            .await
            .map_err(backend)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend)
    }

    async fn count_matching(&self, collection: &str, filter: &Document) -> DocumentResult<u64> {
        self.get_collection(collection)
            .count_documents(filter.clone())
            .await
            .map_err(backend)
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> DocumentResult<u64> {
        Ok(
            self.get_collection(collection)
                .update_one(filter, update)
                .await
                .map_err(backend)?
                .matched_count
        )
    }

    async fn update_many(&self, collection: &str, filter: Document, update: Document) -> DocumentResult<u64> {
        Ok(
            self.get_collection(collection)
                .update_many(filter, update)
                .await
                .map_err(backend)?
                .matched_count
        )
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_one(filter)
                .await
                .map_err(backend)?
                .deleted_count
        )
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_many(filter)
                .await
                .map_err(backend)?
                .deleted_count
        )
    }

    async fn shutdown(self) -> DocumentResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Builder for [`MongoGateway`].
///
/// The client is pinned to Stable API version 1.
///
/// # Example
///
/// ```ignore
/// use docshape::{gateway::GatewayBuilder, mongodb::MongoGatewayBuilder};
///
/// let gateway = MongoGatewayBuilder::new("mongodb://localhost:27017", "app")
///     .build()
///     .await?;
/// ```
pub struct MongoGatewayBuilder {
    dsn: String,
    database: String,
}

impl MongoGatewayBuilder {
    /// Creates a builder for the given connection string and database name.
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }

    /// Reads the connection string from `MONGO_URL` and the database name from `MONGO_DB`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Initialization`] when either variable is missing.
    pub fn from_env() -> DocumentResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DocumentResult<Self> {
        let read = |name: &str| lookup(name)
            .ok_or_else(|| DocumentError::Initialization(format!("{name} is not set")));

        Ok(Self::new(&read(ENV_URL)?, &read(ENV_DB)?))
    }
}

#[async_trait]
impl GatewayBuilder for MongoGatewayBuilder {
    type Gateway = MongoGateway;

    async fn build(self) -> DocumentResult<Self::Gateway> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentError::Initialization(e.to_string()))?;
        options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .build()
        );

        Ok(MongoGateway::new(
            Client::with_options(options)
                .map_err(|e| DocumentError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
