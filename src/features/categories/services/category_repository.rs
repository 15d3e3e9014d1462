use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Catalog, Category, CategoryPatch, NewCategory};
use crate::modules::document_store::{encode, DocumentStore, StoreError};
use crate::shared::clock::Clock;
use crate::shared::constants::{DEFAULT_CATEGORY_COLOR, MAX_NAME_LENGTH};

/// Category persistence for both catalogs plus the last loaded snapshots
///
/// Only field-level checks happen here. Hierarchy consistency is the
/// caller's job.
pub struct CategoryRepository {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    snapshots: RwLock<HashMap<Catalog, Vec<Category>>>,
}

impl CategoryRepository {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    /// Full read of one catalog; replaces its snapshot
    pub async fn list(&self, catalog: Catalog) -> Result<Vec<Category>> {
        let documents = self.store.list(catalog.collection()).await?;

        let categories: Vec<Category> = documents
            .iter()
            .filter_map(|doc| match doc.decode::<Category>() {
                Ok(category) => Some(category),
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed {} category {}: {}",
                        catalog,
                        doc.id,
                        e
                    );
                    None
                }
            })
            .collect();

        self.snapshots
            .write()
            .await
            .insert(catalog, categories.clone());

        Ok(categories)
    }

    /// Re-read a catalog from the store, discarding any local state
    pub async fn refresh(&self, catalog: Catalog) -> Result<Vec<Category>> {
        tracing::debug!("Refreshing {} catalog", catalog);
        self.list(catalog).await
    }

    pub async fn refresh_all(&self) -> Result<()> {
        for catalog in Catalog::ALL {
            self.refresh(catalog).await?;
        }
        Ok(())
    }

    /// Read model of a catalog: the last loaded or optimistically applied
    /// state. Loaded from the store on first use; stays as is until the
    /// next `refresh`.
    pub async fn snapshot(&self, catalog: Catalog) -> Result<Vec<Category>> {
        if let Some(categories) = self.snapshots.read().await.get(&catalog) {
            return Ok(categories.clone());
        }
        self.refresh(catalog).await
    }

    /// Install a tentative local state ahead of the writes that back it
    pub async fn apply_local(&self, catalog: Catalog, categories: Vec<Category>) {
        self.snapshots.write().await.insert(catalog, categories);
    }

    pub async fn get(&self, catalog: Catalog, id: Uuid) -> Result<Category> {
        let doc = self
            .store
            .get(catalog.collection(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} category {} not found", catalog, id)))?;

        Ok(doc.decode()?)
    }

    pub async fn create(&self, catalog: Catalog, fields: NewCategory) -> Result<Uuid> {
        let name = normalize_name(&fields.name)?;

        // order = max(existing) + 1, computed against the authoritative list
        let existing = self.store.list(catalog.collection()).await?;
        let order = existing
            .iter()
            .filter_map(|doc| doc.data.get("order").and_then(Value::as_i64))
            .max()
            .map_or(0, |max| max + 1);

        let now = self.clock.now();
        let category = Category {
            id: Uuid::nil(),
            name,
            icon: fields.icon,
            color: fields
                .color
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            is_active: fields.is_active.unwrap_or(true),
            courier_compatible: match catalog {
                Catalog::Store => Some(fields.courier_compatible.unwrap_or(true)),
                Catalog::Product => None,
            },
            order,
            child_categories: fields.child_categories,
            product_categories: match catalog {
                Catalog::Store => Some(fields.product_categories),
                Catalog::Product => None,
            },
            created_at: now,
            updated_at: now,
        };

        let id = self
            .store
            .create(catalog.collection(), encode(&category)?)
            .await?;

        tracing::info!(
            "Created {} category: id={}, name={}, order={}",
            catalog,
            id,
            category.name,
            order
        );
        Ok(id)
    }

    /// Apply a patch; `updatedAt` is always refreshed
    pub async fn update(&self, catalog: Catalog, id: Uuid, mut patch: CategoryPatch) -> Result<()> {
        if let Some(name) = patch.name.take() {
            patch.name = Some(normalize_name(&name)?);
        }

        let mut fields = encode(&patch)?;
        if let Value::Object(map) = &mut fields {
            map.insert("updatedAt".to_string(), json!(self.clock.now()));
        }

        self.store
            .update(catalog.collection(), id, fields)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => {
                    AppError::NotFound(format!("{} category {} not found", catalog, id))
                }
                other => AppError::Persistence(other),
            })
    }

    pub async fn delete(&self, catalog: Catalog, id: Uuid) -> Result<()> {
        self.store.delete(catalog.collection(), id).await?;
        tracing::info!("Deleted {} category {}", catalog, id);
        Ok(())
    }

    /// Unconditional batched delete
    pub async fn delete_many(&self, catalog: Catalog, ids: &[Uuid]) -> Result<()> {
        self.store.delete_many(catalog.collection(), ids).await?;
        tracing::info!("Deleted {} {} categories in one batch", ids.len(), catalog);
        Ok(())
    }
}

/// Names are stored trimmed; the length limit applies after trimming
fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Category name must not be empty".to_string(),
        ));
    }
    if name.chars().count() as u64 > MAX_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Category name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}
