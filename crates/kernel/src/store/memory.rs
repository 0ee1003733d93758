//! In-memory content store.
//!
//! Used by the integration tests and for running the server without
//! PostgreSQL. Per-key serialization comes from `DashMap`'s entry locking:
//! a writer holds the key's shard for the duration of the swap, while keys
//! in other shards proceed untouched.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::models::{ContentItem, ItemAttributes};

use super::{ContentStore, UpsertOutcome};

/// DashMap-backed content store.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    items: DashMap<String, ContentItem>,
}

impl MemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find(&self, base_path: &str) -> Result<Option<ContentItem>> {
        Ok(self.items.get(base_path).map(|entry| entry.clone()))
    }

    async fn create_or_replace(
        &self,
        base_path: &str,
        payload: &serde_json::Value,
    ) -> Result<UpsertOutcome> {
        let attributes = match ItemAttributes::parse(payload) {
            Ok(attributes) => attributes,
            Err(errors) => {
                return Ok(UpsertOutcome::Invalid {
                    item: ContentItem::transient(base_path, payload),
                    errors,
                });
            }
        };

        let now = Utc::now();
        match self.items.entry(base_path.to_string()) {
            Entry::Occupied(mut occupied) => {
                let created_at = occupied.get().created_at;
                let item = ContentItem::from_attributes(base_path, attributes, created_at, now);
                occupied.insert(item.clone());
                Ok(UpsertOutcome::Replaced(item))
            }
            Entry::Vacant(vacant) => {
                let item = ContentItem::from_attributes(base_path, attributes, now, now);
                vacant.insert(item.clone());
                Ok(UpsertOutcome::Created(item))
            }
        }
    }

    async fn healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn payload(format: &str, body: &str) -> serde_json::Value {
        serde_json::json!({
            "format": format,
            "update_type": "major",
            "publishing_app": "publisher",
            "details": { "body": body },
        })
    }

    #[tokio::test]
    async fn create_then_replace() {
        let store = MemoryContentStore::new();

        let outcome = store
            .create_or_replace("/vat-rates", &payload("answer", "v1"))
            .await
            .unwrap();
        assert!(matches!(outcome, UpsertOutcome::Created(_)));

        let outcome = store
            .create_or_replace("/vat-rates", &payload("answer", "v2"))
            .await
            .unwrap();
        let UpsertOutcome::Replaced(item) = outcome else {
            panic!("expected replace");
        };
        assert_eq!(item.details["body"], "v2");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn replace_drops_stale_fields() {
        let store = MemoryContentStore::new();

        let mut first = payload("answer", "v1");
        first["title"] = serde_json::json!("Original title");
        store.create_or_replace("/vat-rates", &first).await.unwrap();

        // Second payload has no title: full replace, not merge.
        store
            .create_or_replace("/vat-rates", &payload("answer", "v2"))
            .await
            .unwrap();

        let stored = store.find("/vat-rates").await.unwrap().unwrap();
        assert!(stored.title.is_none());
    }

    #[tokio::test]
    async fn invalid_payload_leaves_store_untouched() {
        let store = MemoryContentStore::new();
        store
            .create_or_replace("/vat-rates", &payload("answer", "v1"))
            .await
            .unwrap();

        let outcome = store
            .create_or_replace("/vat-rates", &serde_json::json!({"format": ""}))
            .await
            .unwrap();
        assert!(matches!(outcome, UpsertOutcome::Invalid { .. }));

        let stored = store.find("/vat-rates").await.unwrap().unwrap();
        assert_eq!(stored.details["body"], "v1");
    }

    #[tokio::test]
    async fn created_at_survives_replace() {
        let store = MemoryContentStore::new();
        store
            .create_or_replace("/vat-rates", &payload("answer", "v1"))
            .await
            .unwrap();
        let first = store.find("/vat-rates").await.unwrap().unwrap();

        store
            .create_or_replace("/vat-rates", &payload("answer", "v2"))
            .await
            .unwrap();
        let second = store.find("/vat-rates").await.unwrap().unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn concurrent_same_key_writes_leave_one_item() {
        let store = Arc::new(MemoryContentStore::new());

        let mut handles = Vec::new();
        for n in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let outcome = store
                    .create_or_replace("/contended", &payload("answer", &format!("v{n}")))
                    .await
                    .unwrap();
                matches!(outcome, UpsertOutcome::Created(_))
            }));
        }

        let mut creates = 0;
        for handle in handles {
            if handle.await.unwrap() {
                creates += 1;
            }
        }

        // Exactly one writer observed an empty slot; the rest replaced.
        assert_eq!(creates, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn distinct_keys_are_independent() {
        let store = Arc::new(MemoryContentStore::new());

        let mut handles = Vec::new();
        for n in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .create_or_replace(&format!("/path-{n}"), &payload("answer", "v1"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 8);
    }
}
