use async_trait::async_trait;
use kumquat::{
    db::EntityStore,
    models::{Entity, EntityKind},
    Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Entity store over a map keyed by kind and repository id.
#[derive(Default)]
pub struct MemoryStore {
    entities: HashMap<(EntityKind, String), Entity>,
    batches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity: impl Into<Entity>) -> Self {
        let entity = entity.into();
        self.entities
            .insert((entity.kind(), entity.repository_id().to_string()), entity);
        self
    }

    /// Number of `load_batch` calls served.
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn load_batch(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Option<Entity>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .map(|id| self.entities.get(&(kind, id.clone())).cloned())
            .collect())
    }
}
