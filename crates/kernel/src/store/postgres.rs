//! PostgreSQL-backed content store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};

use crate::models::{ContentItem, ItemAttributes};

use super::{ContentStore, UpsertOutcome};

/// Content store backed by a `content_items` table.
///
/// Create-or-replace is a single `INSERT ... ON CONFLICT DO UPDATE`
/// statement, so concurrent writes to the same base path are serialized by
/// the database's row lock without affecting other keys.
#[derive(Clone)]
pub struct PostgresContentStore {
    pool: PgPool,
}

impl PostgresContentStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    async fn find(&self, base_path: &str) -> Result<Option<ContentItem>> {
        let item = sqlx::query_as::<_, ContentItem>(
            "SELECT base_path, title, description, format, update_type, publishing_app, details, public_updated_at, created_at, updated_at FROM content_items WHERE base_path = $1"
        )
        .bind(base_path)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch content item by base_path")?;

        Ok(item)
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

        // Whole-record replace: every mutable column is set from the new
        // payload, so optional fields absent from it become NULL.
        // `xmax = 0` is true only for freshly inserted rows.
        let row = sqlx::query(
            r#"
            INSERT INTO content_items
                (base_path, title, description, format, update_type, publishing_app, details, public_updated_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            ON CONFLICT (base_path) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                format = EXCLUDED.format,
                update_type = EXCLUDED.update_type,
                publishing_app = EXCLUDED.publishing_app,
                details = EXCLUDED.details,
                public_updated_at = EXCLUDED.public_updated_at,
                updated_at = now()
            RETURNING base_path, title, description, format, update_type, publishing_app, details, public_updated_at, created_at, updated_at, (xmax = 0) AS was_inserted
            "#,
        )
        .bind(base_path)
        .bind(&attributes.title)
        .bind(&attributes.description)
        .bind(&attributes.format)
        .bind(&attributes.update_type)
        .bind(&attributes.publishing_app)
        .bind(&attributes.details)
        .bind(attributes.public_updated_at)
        .fetch_one(&self.pool)
        .await
        .context("failed to upsert content item")?;

        let was_inserted: bool = row
            .try_get("was_inserted")
            .context("upsert returned no insert flag")?;
        let item = ContentItem::from_row(&row).context("failed to decode upserted content item")?;

        if was_inserted {
            Ok(UpsertOutcome::Created(item))
        } else {
            Ok(UpsertOutcome::Replaced(item))
        }
    }

    async fn healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

impl std::fmt::Debug for PostgresContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresContentStore").finish()
    }
}
