//! Store module for record persistence
//!
//! This module provides a unified document store interface with multiple
//! backend implementations:
//! - **MongoDB store** - Collections per namespace (optional, requires `mongo` feature)
//! - **Memory store** - In-process documents, for tests and embedding
//!
//! Records describe themselves through the [`Item`] trait and may opt into
//! identifier assignment ([`IdSetter`]) and timestamp tracking
//! ([`TimeTracker`]).
//!
//! # Examples
//!
//! ```rust
//! use docstore::store::{IdSetter, Item, ListOpt, MemoryStore, Sort, Store};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Task {
//!     namespace: String,
//!     #[serde(rename = "_id")]
//!     id: String,
//!     title: String,
//! }
//!
//! impl Item for Task {
//!     fn namespace(&self) -> &str { &self.namespace }
//!     fn id(&self) -> &str { &self.id }
//!     fn as_id_setter(&mut self) -> Option<&mut dyn IdSetter> { Some(self) }
//! }
//!
//! impl IdSetter for Task {
//!     fn set_id(&mut self, id: String) { self.id = id; }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//!
//! let mut task = Task { namespace: "tasks".into(), title: "write docs".into(), ..Default::default() };
//! store.create(&mut task).await?;
//!
//! let mut fetched = Task { namespace: "tasks".into(), id: task.id.clone(), ..Default::default() };
//! store.read(&mut fetched).await?;
//! assert_eq!(fetched.title, "write docs");
//!
//! let mut page = vec![Task { namespace: "tasks".into(), ..Default::default() }; 10];
//! let filled = store.list(&mut page, &ListOpt::new(0, 10, Sort::Natural)).await?;
//! assert_eq!(filled, 1);
//! # Ok(())
//! # }
//! ```

// Core store API and types
pub mod store_api;

// Store backend implementations
pub mod store_memory;
pub mod store_mongo;

// Re-export main types for convenience
pub use store_api::{
    IdSetter, Item, ListOpt, Sort, SortDirection, SortKey, Store, StoreBackend, TimeTracker,
};

pub use store_memory::MemoryStore;
pub use store_mongo::{MongoConfig, MongoStore};

use crate::error::{StoreError, StoreResult};

/// Store factory for creating store instances
pub struct StoreFactory;

impl StoreFactory {
    /// Create a memory store instance
    pub fn create_memory() -> MemoryStore {
        MemoryStore::new()
    }

    /// Create a MongoDB store instance
    pub async fn create_mongo(config: MongoConfig) -> StoreResult<MongoStore> {
        MongoStore::open(config).await
    }

    /// Create a store from URL
    ///
    /// `memory://` opens an empty memory store; `mongodb://` and
    /// `mongodb+srv://` connect to MongoDB and bind `db_name`.
    pub async fn from_url(url: &str, db_name: &str) -> StoreResult<AnyStore> {
        if url.starts_with("memory://") {
            Ok(AnyStore::Memory(MemoryStore::new()))
        } else if url.starts_with("mongodb://") || url.starts_with("mongodb+srv://") {
            #[cfg(feature = "mongo")]
            {
                let store = MongoStore::open(MongoConfig::new(db_name, url)).await?;
                Ok(AnyStore::Mongo(store))
            }
            #[cfg(not(feature = "mongo"))]
            {
                let _ = db_name;
                Err(StoreError::BackendNotAvailable {
                    backend: StoreBackend::Mongo.as_str().to_string(),
                })
            }
        } else {
            Err(StoreError::BackendNotAvailable {
                backend: url.split("://").next().unwrap_or(url).to_string(),
            })
        }
    }
}

/// A store of any backend, chosen at runtime
pub enum AnyStore {
    /// MongoDB backend
    #[cfg(feature = "mongo")]
    Mongo(MongoStore),
    /// Memory backend
    Memory(MemoryStore),
}

macro_rules! dispatch {
    ($self:expr, $store:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "mongo")]
            AnyStore::Mongo($store) => $call,
            AnyStore::Memory($store) => $call,
        }
    };
}

impl Store for AnyStore {
    async fn create<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        dispatch!(self, store => store.create(item).await)
    }

    async fn read<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        dispatch!(self, store => store.read(item).await)
    }

    async fn update<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        dispatch!(self, store => store.update(item).await)
    }

    async fn delete<T: Item>(&self, item: &T) -> StoreResult<()> {
        dispatch!(self, store => store.delete(item).await)
    }

    async fn list<T: Item>(&self, items: &mut [T], opt: &ListOpt) -> StoreResult<usize> {
        dispatch!(self, store => store.list(items, opt).await)
    }

    async fn close(&mut self) -> StoreResult<()> {
        dispatch!(self, store => store.close().await)
    }

    fn backend_type(&self) -> StoreBackend {
        dispatch!(self, store => store.backend_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store_api::test_support::Tracked;

    #[tokio::test]
    async fn test_factory_from_url_memory() {
        let store = StoreFactory::from_url("memory://", "unused").await.unwrap();
        assert_eq!(store.backend_type(), StoreBackend::Memory);
    }

    #[tokio::test]
    async fn test_factory_from_url_unsupported() {
        let result = StoreFactory::from_url("s3://bucket", "db").await;
        assert!(matches!(
            result,
            Err(StoreError::BackendNotAvailable { ref backend }) if backend == "s3"
        ));
    }

    #[tokio::test]
    async fn test_any_store_dispatch() {
        let mut store = StoreFactory::from_url("memory://", "db").await.unwrap();

        let mut item = Tracked::new("X", "a");
        store.create(&mut item).await.unwrap();

        let mut fetched = Tracked::slot("X", &item.id);
        store.read(&mut fetched).await.unwrap();
        assert_eq!(fetched.status, "a");

        store.close().await.unwrap();
        assert!(store.read(&mut fetched).await.is_err());
    }

    #[test]
    fn test_factory_create_memory() {
        let store = StoreFactory::create_memory();
        assert_eq!(store.backend_type(), StoreBackend::Memory);
    }
}
