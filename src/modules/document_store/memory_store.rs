use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{merge_patch, Document, DocumentStore, StoreError};

/// Process-local document store
///
/// Collections keep insertion order so listings match the creation-ordered
/// scans of the PostgreSQL backend.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    failing_writes: RwLock<HashSet<Uuid>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write touching `id` fail
    #[cfg(test)]
    pub async fn fail_writes_for(&self, id: Uuid) {
        self.failing_writes.write().await.insert(id);
    }

    async fn check_writable(&self, id: Uuid) -> Result<(), StoreError> {
        if self.failing_writes.read().await.contains(&id) {
            return Err(StoreError::Unavailable(format!(
                "write rejected for document {}",
                id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn create(&self, collection: &str, fields: Value) -> Result<Uuid, StoreError> {
        let id = Uuid::now_v7();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(Document { id, data: fields });
        Ok(id)
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<(), StoreError> {
        self.check_writable(id).await?;

        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })?;

        merge_patch(&mut doc.data, patch);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        self.check_writable(id).await?;

        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }

    async fn delete_many(&self, collection: &str, ids: &[Uuid]) -> Result<(), StoreError> {
        // all-or-nothing: check every id before touching the collection
        for id in ids {
            self.check_writable(*id).await?;
        }

        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|d| !ids.contains(&d.id));
        }
        Ok(())
    }
}
