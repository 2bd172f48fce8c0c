//! Backend-neutral store API
//!
//! This module provides the contract every document store backend implements
//! (MongoDB, in-memory) together with the record capability traits and the
//! list options shared by all of them.

use crate::error::{StoreError, StoreResult};
use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Name of the primary-key field in stored documents
pub const ID_FIELD: &str = "_id";

/// Name of the creation timestamp field used for sorting
pub const CREATED_FIELD: &str = "created";

/// Name of the update timestamp field used for sorting
pub const UPDATED_FIELD: &str = "updated";

/// Store backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreBackend {
    /// MongoDB document database
    Mongo,
    /// In-process memory store
    Memory,
}

impl StoreBackend {
    /// Handler name of the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Mongo => "mongodb",
            StoreBackend::Memory => "memory",
        }
    }
}

/// A persisted record
///
/// The namespace selects the collection and must stay constant for the
/// lifetime of the record. Optional capabilities are exposed through
/// [`Item::as_id_setter`] and [`Item::as_time_tracker`]; a record opts in by
/// returning `Some(self)`.
///
/// Reads replace the whole value with the decoded document, so fields the
/// record skips during serialization come back as their defaults.
pub trait Item: Serialize + DeserializeOwned + Send + Sync {
    /// Namespace (collection) of the record
    fn namespace(&self) -> &str;

    /// Primary key of the record
    fn id(&self) -> &str;

    /// Identifier assignment capability
    fn as_id_setter(&mut self) -> Option<&mut dyn IdSetter> {
        None
    }

    /// Timestamp tracking capability
    fn as_time_tracker(&mut self) -> Option<&mut dyn TimeTracker> {
        None
    }
}

/// Records that accept a store-generated identifier on create
pub trait IdSetter {
    /// Replace the record identifier
    fn set_id(&mut self, id: String);
}

/// Records that carry created/updated unix timestamps (seconds)
pub trait TimeTracker {
    /// Set the creation time
    fn set_created(&mut self, unix_time: i64);
    /// Set the last update time
    fn set_updated(&mut self, unix_time: i64);
    /// Creation time
    fn created(&self) -> i64;
    /// Last update time
    fn updated(&self) -> i64;
}

/// Sort order for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum Sort {
    /// Storage order
    #[default]
    Natural = 0,
    /// Oldest to newest
    CreatedAsc = 1,
    /// Newest to oldest
    CreatedDesc = 2,
    /// Least to most recently updated
    UpdatedAsc = 3,
    /// Most to least recently updated
    UpdatedDesc = 4,
}

/// Direction of a sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending
    Ascending,
    /// Descending
    Descending,
}

impl SortDirection {
    /// MongoDB sort specifier value
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Field and direction a list query is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Document field
    pub field: &'static str,
    /// Ordering direction
    pub direction: SortDirection,
}

impl Sort {
    /// Sort key for this order, `None` for storage order
    pub fn sort_key(&self) -> Option<SortKey> {
        let (field, direction) = match self {
            Sort::Natural => return None,
            Sort::CreatedAsc => (CREATED_FIELD, SortDirection::Ascending),
            Sort::CreatedDesc => (CREATED_FIELD, SortDirection::Descending),
            Sort::UpdatedAsc => (UPDATED_FIELD, SortDirection::Ascending),
            Sort::UpdatedDesc => (UPDATED_FIELD, SortDirection::Descending),
        };
        Some(SortKey { field, direction })
    }
}

impl TryFrom<i32> for Sort {
    type Error = StoreError;

    fn try_from(value: i32) -> StoreResult<Self> {
        match value {
            0 => Ok(Sort::Natural),
            1 => Ok(Sort::CreatedAsc),
            2 => Ok(Sort::CreatedDesc),
            3 => Ok(Sort::UpdatedAsc),
            4 => Ok(Sort::UpdatedDesc),
            other => Err(StoreError::InvalidListOptions {
                reason: format!("unknown sort value {}", other),
            }),
        }
    }
}

/// Pagination and ordering for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOpt {
    /// Zero-based page index
    pub page: u64,
    /// Page size, must be positive
    pub limit: u64,
    /// Result ordering
    pub sort: Sort,
}

impl ListOpt {
    /// Create list options
    pub fn new(page: u64, limit: u64, sort: Sort) -> Self {
        Self { page, limit, sort }
    }

    /// Number of documents skipped before the page starts
    pub fn skip(&self) -> StoreResult<u64> {
        if self.limit == 0 {
            return Err(StoreError::InvalidListOptions {
                reason: "limit must be positive".to_string(),
            });
        }
        self.page
            .checked_mul(self.limit)
            .ok_or_else(|| StoreError::InvalidListOptions {
                reason: format!("page {} with limit {} overflows skip", self.page, self.limit),
            })
    }

    /// Page size bounded by the slots the caller provided
    pub fn effective_limit(&self, slots: usize) -> u64 {
        self.limit.min(slots as u64)
    }
}

/// Document store API implemented by every backend
pub trait Store: Send + Sync {
    /// Insert a new record, assigning identifier and timestamps when supported
    fn create<T: Item>(&self, item: &mut T) -> impl Future<Output = StoreResult<()>> + Send;

    /// Load the record with the item's identifier into `item`
    fn read<T: Item>(&self, item: &mut T) -> impl Future<Output = StoreResult<()>> + Send;

    /// Overwrite the stored fields of an existing record
    fn update<T: Item>(&self, item: &mut T) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove the record with the item's identifier
    fn delete<T: Item>(&self, item: &T) -> impl Future<Output = StoreResult<()>> + Send;

    /// Fill `items` with one page of the namespace of `items[0]`
    ///
    /// Returns the number of slots filled. On a decode failure the slots
    /// filled so far keep their new values.
    fn list<T: Item>(
        &self,
        items: &mut [T],
        opt: &ListOpt,
    ) -> impl Future<Output = StoreResult<usize>> + Send;

    /// Release the backend connection; calling it again is a no-op
    fn close(&mut self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Get store backend type
    fn backend_type(&self) -> StoreBackend;
}

/// Helpers shared by the backend implementations
pub mod utils {
    use super::*;

    /// Current wall-clock time in unix seconds
    pub fn now_unix() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Apply the create-time capabilities of `item`
    pub fn prepare_create<T: Item>(item: &mut T, now: i64) {
        if let Some(setter) = item.as_id_setter() {
            setter.set_id(uuid::Uuid::new_v4().to_string());
        }
        if let Some(tracker) = item.as_time_tracker() {
            tracker.set_created(now);
            tracker.set_updated(now);
        }
    }

    /// Apply the update-time capabilities of `item`
    pub fn prepare_update<T: Item>(item: &mut T, now: i64) {
        if let Some(tracker) = item.as_time_tracker() {
            tracker.set_updated(now);
        }
    }

    /// Encode a record, binding `_id` to its identifier
    ///
    /// An empty identifier leaves `_id` unset so the backend assigns one.
    pub fn encode_item<T: Item>(item: &T) -> StoreResult<Document> {
        let mut doc = bson::to_document(item)?;
        let id = item.id();
        if id.is_empty() {
            if matches!(doc.get(ID_FIELD), Some(Bson::String(s)) if s.is_empty()) {
                doc.remove(ID_FIELD);
            }
        } else {
            doc.insert(ID_FIELD, id);
        }
        Ok(doc)
    }

    /// Encode the `$set` fields of an update
    ///
    /// `_id` is never rewritten, and for time-tracked records neither is the
    /// creation time, so a record rebuilt by the caller keeps its stored
    /// `created` value.
    pub fn encode_update<T: Item>(item: &mut T) -> StoreResult<Document> {
        let mut fields = encode_item(item)?;
        fields.remove(ID_FIELD);
        if item.as_time_tracker().is_some() {
            fields.remove(CREATED_FIELD);
        }
        Ok(fields)
    }

    /// Decode a stored document into a record
    pub fn decode_item<T: Item>(doc: Document) -> StoreResult<T> {
        Ok(bson::from_document(doc)?)
    }

    /// Namespace of the first slot of a list call
    pub fn list_namespace<T: Item>(items: &[T]) -> StoreResult<String> {
        items
            .first()
            .map(|item| item.namespace().to_string())
            .ok_or_else(|| StoreError::InvalidListOptions {
                reason: "no slots to list into".to_string(),
            })
    }
}
