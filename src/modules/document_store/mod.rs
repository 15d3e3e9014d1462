//! Document store abstraction
//!
//! Every catalog, the rule set and the Superpass tokens live in named
//! collections of schemaless JSON documents. Services only ever perform
//! full-collection scans plus per-document writes, so the trait stays small.

mod memory_store;
mod postgres_store;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use memory_store::MemoryDocumentStore;
pub use postgres_store::PgDocumentStore;

/// Collection holding store categories
pub const STORE_CATEGORIES: &str = "storeCategories";
/// Collection holding product categories
pub const PRODUCT_CATEGORIES: &str = "productCategories";
/// Collection holding category rules
pub const CATEGORY_RULES: &str = "categoryRules";
/// Collection holding Superpass authorization tokens
pub const SUPERPASS_TOKENS: &str = "superpassTokens";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {id} not found in '{collection}'")]
    NotFound { collection: String, id: Uuid },

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A stored document: the store-assigned id plus its JSON fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub data: Value,
}

impl Document {
    /// Deserialize into a typed record; the id is exposed as an `id` field
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = match &self.data {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        fields.insert("id".to_string(), Value::String(self.id.to_string()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Serialize a record into document fields, dropping any `id` key
pub fn encode<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        map.remove("id");
    }
    Ok(value)
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection in creation order
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Insert a new document and return the id assigned to it
    async fn create(&self, collection: &str, fields: Value) -> Result<Uuid, StoreError>;

    /// Shallow-merge `patch` into an existing document
    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError>;

    /// Delete several documents as one batched write
    async fn delete_many(&self, collection: &str, ids: &[Uuid]) -> Result<(), StoreError>;
}

/// Merge the top-level keys of `patch` into `target`
pub(crate) fn merge_patch(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}
