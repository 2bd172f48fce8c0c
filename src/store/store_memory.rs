//! In-memory store backend
//!
//! Keeps BSON documents per namespace in insertion order and follows the same
//! observable rules as the MongoDB backend: `_id` uniqueness, `$set` updates,
//! null-first sorting and skip/limit paging.

use crate::error::{StoreError, StoreResult};
use crate::store::store_api::{
    utils, Item, ListOpt, SortDirection, Store, StoreBackend, ID_FIELD,
};
use bson::oid::ObjectId;
use bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

type Namespaces = HashMap<String, Vec<Document>>;

/// In-memory store
///
/// Clones share both the documents and the open/closed state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Namespaces>>,
    closed: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held in a namespace
    pub async fn count(&self, namespace: &str) -> usize {
        self.data
            .read()
            .await
            .get(namespace)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(StoreError::closed());
        }
        Ok(())
    }
}

fn id_matches(doc: &Document, id: &str) -> bool {
    matches!(doc.get(ID_FIELD), Some(Bson::String(existing)) if existing == id)
}

/// Orders two field values the way MongoDB does for the types records use:
/// missing and null first, then numbers, then strings.
fn compare_field(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    fn rank(value: Option<&Bson>) -> u8 {
        match value {
            None | Some(Bson::Null) => 0,
            Some(Bson::Int32(_)) | Some(Bson::Int64(_)) | Some(Bson::Double(_)) => 1,
            Some(Bson::String(_)) => 2,
            Some(_) => 3,
        }
    }

    fn as_f64(value: &Bson) -> Option<f64> {
        match value {
            Bson::Int32(v) => Some(f64::from(*v)),
            Bson::Int64(v) => Some(*v as f64),
            Bson::Double(v) => Some(*v),
            _ => None,
        }
    }

    match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => match (as_f64(x), as_f64(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => rank(a).cmp(&rank(b)),
        },
        _ => rank(a).cmp(&rank(b)),
    }
}

impl Store for MemoryStore {
    async fn create<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        self.ensure_open()?;
        utils::prepare_create(item, utils::now_unix());

        let mut doc = utils::encode_item(item)?;
        let namespace = item.namespace().to_string();
        let mut data = self.data.write().await;
        let collection = data.entry(namespace.clone()).or_default();

        match doc.get(ID_FIELD) {
            Some(Bson::String(id)) if collection.iter().any(|d| id_matches(d, id)) => {
                error!(namespace = %namespace, id = %id, "No insertion, duplicate key");
                return Err(StoreError::DuplicateKey {
                    namespace,
                    id: id.clone(),
                });
            }
            Some(_) => {}
            None => {
                doc.insert(ID_FIELD, ObjectId::new());
            }
        }

        debug!(namespace = %namespace, id = ?doc.get(ID_FIELD), "Inserted a single document");
        collection.push(doc);
        Ok(())
    }

    async fn read<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        self.ensure_open()?;
        let doc = {
            let data = self.data.read().await;
            data.get(item.namespace())
                .and_then(|docs| docs.iter().find(|d| id_matches(d, item.id())))
                .cloned()
        };

        let Some(doc) = doc else {
            error!(
                namespace = %item.namespace(),
                id = %item.id(),
                "The filter did not match any document"
            );
            return Err(StoreError::not_found(item.namespace(), item.id()));
        };

        *item = utils::decode_item(doc)?;
        debug!(namespace = %item.namespace(), "Found document");
        Ok(())
    }

    async fn update<T: Item>(&self, item: &mut T) -> StoreResult<()> {
        self.ensure_open()?;
        utils::prepare_update(item, utils::now_unix());

        let fields = utils::encode_update(item)?;

        let mut data = self.data.write().await;
        let target = data
            .get_mut(item.namespace())
            .and_then(|docs| docs.iter_mut().find(|d| id_matches(d, item.id())));

        let (matched, modified) = match target {
            Some(doc) => {
                let mut modified = false;
                for (key, value) in fields {
                    if doc.get(&key) != Some(&value) {
                        doc.insert(key, value);
                        modified = true;
                    }
                }
                (1u64, u64::from(modified))
            }
            None => (0, 0),
        };

        if matched != 1 && modified != 1 {
            debug!(matched, modified, "No update in collection");
            return Err(StoreError::not_found(item.namespace(), item.id()));
        }
        Ok(())
    }

    async fn delete<T: Item>(&self, item: &T) -> StoreResult<()> {
        self.ensure_open()?;
        let mut data = self.data.write().await;
        let deleted = match data.get_mut(item.namespace()) {
            Some(docs) => {
                let before = docs.len();
                if let Some(pos) = docs.iter().position(|d| id_matches(d, item.id())) {
                    docs.remove(pos);
                }
                before - docs.len()
            }
            None => 0,
        };

        if deleted != 1 {
            debug!(deleted, "Nothing is deleted");
            return Err(StoreError::not_found(item.namespace(), item.id()));
        }
        Ok(())
    }

    async fn list<T: Item>(&self, items: &mut [T], opt: &ListOpt) -> StoreResult<usize> {
        self.ensure_open()?;
        let namespace = utils::list_namespace(items)?;
        let skip = opt.skip()?;
        let limit = opt.effective_limit(items.len());

        let mut docs = {
            let data = self.data.read().await;
            data.get(&namespace).cloned().unwrap_or_default()
        };

        if let Some(key) = opt.sort.sort_key() {
            docs.sort_by(|a, b| {
                let ordering = compare_field(a.get(key.field), b.get(key.field));
                match key.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let mut filled = 0;
        for (slot, doc) in items
            .iter_mut()
            .zip(docs.into_iter().skip(skip).take(limit as usize))
        {
            *slot = utils::decode_item(doc).map_err(|e| {
                error!(namespace = %namespace, error = %e, "Failed decoding");
                e
            })?;
            filled += 1;
        }

        Ok(filled)
    }

    async fn close(&mut self) -> StoreResult<()> {
        self.closed.store(true, AtomicOrdering::Release);
        Ok(())
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}
