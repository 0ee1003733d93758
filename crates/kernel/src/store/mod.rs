//! Content storage with atomic create-or-replace semantics.
//!
//! Stores are keyed by encoded `base_path`. Writes for the same key are
//! serialized; writes for distinct keys proceed independently. Validation
//! happens before anything touches stored state, so a failed attempt is
//! never committed.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ContentItem, FieldErrors};

mod memory;
mod postgres;

pub use memory::MemoryContentStore;
pub use postgres::PostgresContentStore;

/// Result of a create-or-replace write.
#[derive(Debug)]
pub enum UpsertOutcome {
    /// No item existed for the base path; one was created.
    Created(ContentItem),

    /// An item existed and all of its mutable fields were replaced.
    Replaced(ContentItem),

    /// The payload failed shape validation; stored state is untouched.
    Invalid {
        item: ContentItem,
        errors: FieldErrors,
    },
}

/// Keyed content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Look up an item by encoded base path.
    async fn find(&self, base_path: &str) -> Result<Option<ContentItem>>;

    /// Atomically create or wholly replace the item at `base_path`.
    async fn create_or_replace(
        &self,
        base_path: &str,
        payload: &serde_json::Value,
    ) -> Result<UpsertOutcome>;

    /// Whether the backing storage is reachable.
    async fn healthy(&self) -> bool;
}
