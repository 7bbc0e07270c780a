//! PostgreSQL entity store

use crate::{
    db::traits::EntityStore,
    models::{Collection, Entity, EntityKind, Item},
    Result,
};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;

/// Entity store backed by the `items` and `collections` tables.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_items(&self, ids: &[String]) -> Result<Vec<Entity>> {
        let query = r#"
            SELECT
                repository_id,
                collection_repository_id,
                parent_repository_id,
                title,
                variant,
                media_type,
                published,
                updated_at
            FROM items
            WHERE repository_id = ANY($1)
        "#;

        let rows = sqlx::query(query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::Error::Database)?;

        Ok(rows.iter().map(item_from_row).map(Entity::Item).collect())
    }

    async fn load_collections(&self, ids: &[String]) -> Result<Vec<Entity>> {
        let query = r#"
            SELECT
                repository_id,
                parent_repository_id,
                title,
                description,
                published,
                updated_at
            FROM collections
            WHERE repository_id = ANY($1)
        "#;

        let rows = sqlx::query(query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::Error::Database)?;

        Ok(rows
            .iter()
            .map(collection_from_row)
            .map(Entity::Collection)
            .collect())
    }
}

fn item_from_row(row: &PgRow) -> Item {
    Item {
        repository_id: row.get("repository_id"),
        collection_repository_id: row.get("collection_repository_id"),
        parent_repository_id: row.get("parent_repository_id"),
        title: row.get("title"),
        variant: row.get("variant"),
        media_type: row.get("media_type"),
        published: row.get("published"),
        updated_at: row.get("updated_at"),
    }
}

fn collection_from_row(row: &PgRow) -> Collection {
    Collection {
        repository_id: row.get("repository_id"),
        parent_repository_id: row.get("parent_repository_id"),
        title: row.get("title"),
        description: row.get("description"),
        published: row.get("published"),
        updated_at: row.get("updated_at"),
    }
}

/// Put loaded rows back into request order, leaving gaps for missing ids.
pub(crate) fn reorder(ids: &[String], loaded: Vec<Entity>) -> Vec<Option<Entity>> {
    let by_id: HashMap<String, Entity> = loaded
        .into_iter()
        .map(|e| (e.repository_id().to_string(), e))
        .collect();
    ids.iter().map(|id| by_id.get(id).cloned()).collect()
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn load_batch(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Option<Entity>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let loaded = match kind {
            EntityKind::Item => self.load_items(ids).await?,
            EntityKind::Collection => self.load_collections(ids).await?,
        };
        tracing::debug!(
            kind = %kind,
            requested = ids.len(),
            found = loaded.len(),
            "Loaded entities"
        );
        Ok(reorder(ids, loaded))
    }
}
