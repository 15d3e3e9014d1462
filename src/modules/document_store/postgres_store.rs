use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Document, DocumentStore, StoreError};

/// Document store backed by a single JSONB table in PostgreSQL
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    data: Json<Value>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            data: row.data.0,
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list collection '{}': {:?}", collection, e);
            StoreError::Backend(e)
        })?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get document {} from '{}': {:?}", id, collection, e);
            StoreError::Backend(e)
        })?;

        Ok(row.map(Document::from))
    }

    async fn create(&self, collection: &str, fields: Value) -> Result<Uuid, StoreError> {
        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(fields))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create document in '{}': {:?}", collection, e);
            StoreError::Backend(e)
        })?;

        Ok(id)
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(patch))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update document {} in '{}': {:?}", id, collection, e);
            StoreError::Backend(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }

        Ok(())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete document {} from '{}': {:?}", id, collection, e);
                StoreError::Backend(e)
            })?;

        Ok(())
    }

    async fn delete_many(&self, collection: &str, ids: &[Uuid]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for id in ids {
            sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(*id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to delete document {} from '{}' in batch: {:?}",
                        id,
                        collection,
                        e
                    );
                    StoreError::Backend(e)
                })?;
        }

        tx.commit().await?;
        Ok(())
    }
}
