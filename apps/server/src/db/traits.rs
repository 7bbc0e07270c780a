//! Core traits for entity storage backends

use crate::{
    models::{Entity, EntityKind},
    Result,
};
use async_trait::async_trait;

/// Read access to persisted entities
///
/// Finders only ever need to turn index identifiers back into records, so
/// this is the whole contract a storage backend (PostgreSQL, in-memory,
/// HTTP proxy, etc.) has to meet.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Load entities of one kind by repository id
    ///
    /// # Returns
    /// One slot per requested id, in request order. A slot is `None` when no
    /// record exists for the id (the index may lag behind the database).
    async fn load_batch(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Option<Entity>>>;

    /// Load a single entity
    async fn load(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>> {
        let mut found = self.load_batch(kind, &[id.to_string()]).await?;
        Ok(found.pop().flatten())
    }
}
