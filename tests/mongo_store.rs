//! MongoDB backend tests
//!
//! Tests marked `#[ignore]` need a running server:
//! `DOCSTORE_MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`

#![cfg(feature = "mongo")]

use docstore::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Event {
    namespace: String,
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    updated: i64,
}

impl Event {
    fn slot(namespace: &str, id: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            id: id.to_string(),
            ..Default::default()
        }
    }
}

impl Item for Event {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn as_id_setter(&mut self) -> Option<&mut dyn IdSetter> {
        Some(self)
    }

    fn as_time_tracker(&mut self) -> Option<&mut dyn TimeTracker> {
        Some(self)
    }
}

impl IdSetter for Event {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl TimeTracker for Event {
    fn set_created(&mut self, unix_time: i64) {
        self.created = unix_time;
    }

    fn set_updated(&mut self, unix_time: i64) {
        self.updated = unix_time;
    }

    fn created(&self) -> i64 {
        self.created
    }

    fn updated(&self) -> i64 {
        self.updated
    }
}

fn live_config() -> MongoConfig {
    let uri = std::env::var("DOCSTORE_MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    MongoConfig::new("docstore_test", uri)
}

/// Fresh namespace per test so runs do not see each other's documents
fn namespace(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_open_fails_fast_on_unreachable_server() {
    let config = MongoConfig::new(
        "docstore_test",
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=300&connectTimeoutMS=300",
    );
    let result = MongoStore::open(config).await;
    assert!(matches!(result, Err(StoreError::ConnectionError { .. })));
}

#[tokio::test]
#[ignore]
async fn test_mongo_lifecycle() {
    let mut store = MongoStore::open(live_config()).await.expect("Mongo store init failed");
    let ns = namespace("lifecycle");

    let mut event = Event {
        namespace: ns.clone(),
        status: "a".to_string(),
        ..Default::default()
    };
    store.create(&mut event).await.unwrap();
    assert!(!event.id.is_empty());
    assert_eq!(event.created, event.updated);

    let mut fetched = Event::slot(&ns, &event.id);
    store.read(&mut fetched).await.unwrap();
    assert_eq!(fetched, event);

    // Unchanged payload inside the same second still matches.
    let mut same = fetched.clone();
    store.update(&mut same).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let mut changed = Event {
        status: "b".to_string(),
        ..fetched.clone()
    };
    store.update(&mut changed).await.unwrap();

    let mut fetched = Event::slot(&ns, &event.id);
    store.read(&mut fetched).await.unwrap();
    assert_eq!(fetched.status, "b");
    assert_eq!(fetched.created, event.created);
    assert!(fetched.updated > event.created);

    store.delete(&fetched).await.unwrap();
    let err = store
        .read(&mut Event::slot(&ns, &event.id))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = store
        .update(&mut Event::slot(&ns, &event.id))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = store.delete(&Event::slot(&ns, &event.id)).await.unwrap_err();
    assert!(err.is_not_found());

    store.close().await.unwrap();
    store.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_mongo_list_sorting() {
    let store = MongoStore::open(live_config()).await.expect("Mongo store init failed");
    let ns = namespace("list");

    for _ in 0..4 {
        store.create(&mut Event::slot(&ns, "")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
    }

    let mut slots = vec![Event::slot(&ns, ""); 3];
    let filled = store
        .list(&mut slots, &ListOpt::new(0, 3, Sort::CreatedAsc))
        .await
        .unwrap();
    assert_eq!(filled, 3);
    assert!(slots.windows(2).all(|w| w[0].created <= w[1].created));

    let filled = store
        .list(&mut slots, &ListOpt::new(0, 3, Sort::CreatedDesc))
        .await
        .unwrap();
    assert_eq!(filled, 3);
    assert!(slots.windows(2).all(|w| w[0].created >= w[1].created));

    let mut slots = vec![Event::slot(&ns, ""); 10];
    let filled = store
        .list(&mut slots, &ListOpt::new(0, 10, Sort::Natural))
        .await
        .unwrap();
    assert_eq!(filled, 4);
}

#[tokio::test]
#[ignore]
async fn test_factory_from_mongo_url() {
    let config = live_config();
    let store = StoreFactory::from_url(&config.uri, &config.db_name)
        .await
        .expect("Mongo store init failed");
    assert_eq!(store.backend_type(), StoreBackend::Mongo);
}
