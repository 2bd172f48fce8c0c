//! MongoDB store backend implementation
//!
//! Maps each record namespace to a collection of the configured database and
//! each record identifier to the document `_id`. Connection pooling, retries
//! and server selection are left to the driver.

#[cfg(feature = "mongo")]
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions},
    Client, Collection, Database,
};

use crate::error::{StoreError, StoreResult};
use crate::store::store_api::StoreBackend;
#[cfg(feature = "mongo")]
use crate::store::store_api::{utils, Item, ListOpt, Store, ID_FIELD};
#[cfg(feature = "mongo")]
use bson::{doc, Document};
#[cfg(feature = "mongo")]
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
#[cfg(feature = "mongo")]
use tracing::{debug, error};

/// Server error code for a unique index violation
#[cfg(feature = "mongo")]
const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Database holding one collection per namespace
    pub db_name: String,
    /// Connection string; credentials go inside the URI
    pub uri: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            db_name: "docstore".to_string(),
            uri: "mongodb://localhost:27017".to_string(),
        }
    }
}

impl MongoConfig {
    /// Create a configuration for a database at a connection string
    pub fn new(db_name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            uri: uri.into(),
        }
    }

    /// Backend served by this configuration
    pub fn handler(&self) -> StoreBackend {
        StoreBackend::Mongo
    }
}

/// MongoDB store backend
#[cfg(feature = "mongo")]
pub struct MongoStore {
    client: Option<Client>,
    database: Option<Database>,
    config: MongoConfig,
}

#[cfg(feature = "mongo")]
impl MongoStore {
    /// Connect to the configured server and bind the database
    ///
    /// Issues a `ping` so an unreachable server fails here instead of on the
    /// first operation. No retry is attempted.
    pub async fn open(config: MongoConfig) -> StoreResult<Self> {
        let options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            error!(error = %e, "Invalid connection string");
            StoreError::ConnectionError {
                reason: format!("Failed to parse connection string: {}", e),
            }
        })?;

        let client = Client::with_options(options).map_err(|e| StoreError::ConnectionError {
            reason: format!("Failed to build client: {}", e),
        })?;

        let database = client.database(&config.db_name);
        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                error!(error = %e, "Client is not connected");
                StoreError::ConnectionError {
                    reason: format!("Failed to reach server: {}", e),
                }
            })?;

        debug!(db_name = %config.db_name, "Connected to MongoDB");
        Ok(Self {
            client: Some(client),
            database: Some(database),
            config,
        })
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    fn collection(&self, namespace: &str) -> StoreResult<Collection<Document>> {
        self.database
            .as_ref()
            .map(|db| db.collection::<Document>(namespace))
            .ok_or_else(StoreError::closed)
    }
}

#[cfg(feature = "mongo")]
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[cfg(feature = "mongo")]
fn write_failed(operation: &str, err: mongodb::error::Error) -> StoreError {
    StoreError::WriteFailed {
        operation: operation.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(feature = "mongo")]
fn query_failed(operation: &str, err: mongodb::error::Error) -> StoreError {
    StoreError::QueryFailed {
        operation: operation.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(feature = "mongo")]
impl Store for MongoStore {
    async fn create<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        let collection = self.collection(item.namespace())?;
        utils::prepare_create(item, utils::now_unix());

        let doc = utils::encode_item(item)?;
        let result = collection.insert_one(doc, None).await.map_err(|e| {
            error!(namespace = %item.namespace(), error = %e, "No insertion");
            if is_duplicate_key(&e) {
                StoreError::DuplicateKey {
                    namespace: item.namespace().to_string(),
                    id: item.id().to_string(),
                }
            } else {
                write_failed("insert_one", e)
            }
        })?;

        debug!(inserted_id = %result.inserted_id, "Inserted a single document");
        Ok(())
    }

    async fn read<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        let collection = self.collection(item.namespace())?;
        let filter = doc! { ID_FIELD: item.id() };

        let found = collection
            .find_one(filter, None)
            .await
            .map_err(|e| query_failed("find_one", e))?;

        let Some(doc) = found else {
            error!(
                namespace = %item.namespace(),
                id = %item.id(),
                "The filter did not match any document in the collection"
            );
            return Err(StoreError::not_found(item.namespace(), item.id()));
        };

        *item = utils::decode_item(doc)?;
        debug!(namespace = %item.namespace(), "Found document");
        Ok(())
    }

    async fn update<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        let collection = self.collection(item.namespace())?;
        utils::prepare_update(item, utils::now_unix());

        let fields = utils::encode_update(item)?;
        let filter = doc! { ID_FIELD: item.id() };

        let result = collection
            .update_one(filter, doc! { "$set": fields }, None)
            .await
            .map_err(|e| {
                error!(namespace = %item.namespace(), error = %e, "No update");
                write_failed("update_one", e)
            })?;

        if result.matched_count != 1 && result.modified_count != 1 {
            debug!(
                matched = result.matched_count,
                modified = result.modified_count,
                "No update in collection"
            );
            return Err(StoreError::not_found(item.namespace(), item.id()));
        }
        Ok(())
    }

    async fn delete<T: Item>(&self, item: &T) -> StoreResult<()> {
        let collection = self.collection(item.namespace())?;
        let filter = doc! { ID_FIELD: item.id() };

        let result = collection.delete_one(filter, None).await.map_err(|e| {
            error!(namespace = %item.namespace(), error = %e, "No deletion");
            write_failed("delete_one", e)
        })?;

        if result.deleted_count != 1 {
            debug!(deleted = result.deleted_count, "Nothing is deleted");
            return Err(StoreError::not_found(item.namespace(), item.id()));
        }
        Ok(())
    }

    async fn list<T: Item>(&self, items: &mut [T], opt: &ListOpt) -> StoreResult<usize> {
        let namespace = utils::list_namespace(items)?;
        let collection = self.collection(&namespace)?;

        let limit = opt.effective_limit(items.len());
        let mut options = FindOptions::default();
        options.skip = Some(opt.skip()?);
        options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        options.sort = opt
            .sort
            .sort_key()
            .map(|key| doc! { key.field: key.direction.as_i32() });

        let mut cursor = collection.find(doc! {}, options).await.map_err(|e| {
            error!(namespace = %namespace, error = %e, "Not able to query data");
            query_failed("find", e)
        })?;

        let mut filled = 0;
        while filled < items.len() {
            let next = cursor.try_next().await.map_err(|e| {
                error!(namespace = %namespace, error = %e, "Failed reading cursor");
                query_failed("cursor_next", e)
            })?;
            let Some(doc) = next else { break };

            items[filled] = utils::decode_item(doc).map_err(|e| {
                error!(namespace = %namespace, error = %e, "Failed decoding");
                e
            })?;
            filled += 1;
        }

        Ok(filled)
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.database = None;
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            debug!(db_name = %self.config.db_name, "Disconnected from MongoDB");
        }
        Ok(())
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Mongo
    }
}

// Stub implementation for when the mongo feature is not enabled
/// MongoDB store backend (unavailable without the `mongo` feature)
#[cfg(not(feature = "mongo"))]
pub struct MongoStore;

#[cfg(not(feature = "mongo"))]
impl MongoStore {
    /// Always fails: the crate was built without the `mongo` feature
    pub async fn open(_config: MongoConfig) -> StoreResult<Self> {
        Err(StoreError::BackendNotAvailable {
            backend: StoreBackend::Mongo.as_str().to_string(),
        })
    }
}
