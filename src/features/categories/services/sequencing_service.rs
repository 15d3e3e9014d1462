use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Catalog, Category, CategoryPatch};
use crate::features::categories::services::hierarchy_resolver::table_order;
use crate::features::categories::services::CategoryRepository;

/// Where a dragged category was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Onto another category; takes that category's position
    Item(Uuid),
    /// At a list position, clamped to the end
    Index(usize),
}

/// Tentative result of a drag: the reordered list and the writes backing it
///
/// Never partially replayed; either every write lands or the plan is
/// discarded and the catalog re-read.
#[derive(Debug, Clone)]
pub struct ReorderPlan {
    pub reordered: Vec<Category>,
    pub writes: Vec<(Uuid, i64)>,
}

impl ReorderPlan {
    /// Move `from` to `to` and renumber every item 0..n
    pub fn build(mut items: Vec<Category>, from: usize, to: usize) -> Self {
        let dragged = items.remove(from);
        items.insert(to.min(items.len()), dragged);

        let mut writes = Vec::new();
        for (position, item) in items.iter_mut().enumerate() {
            let position = position as i64;
            if item.order != position {
                item.order = position;
                writes.push((item.id, position));
            }
        }

        Self {
            reordered: items,
            writes,
        }
    }
}

/// Drag-and-drop re-sequencing with optimistic local apply
pub struct SequencingService {
    repository: Arc<CategoryRepository>,
}

impl SequencingService {
    pub fn new(repository: Arc<CategoryRepository>) -> Self {
        Self { repository }
    }

    /// Display order the catalog is dragged in
    fn display_order(catalog: Catalog, categories: Vec<Category>) -> Vec<Category> {
        match catalog {
            Catalog::Store => table_order(&categories),
            Catalog::Product => {
                let mut items = categories;
                items.sort_by_key(|c| c.order);
                items
            }
        }
    }

    pub async fn reorder(
        &self,
        catalog: Catalog,
        dragged_id: Uuid,
        target: DropTarget,
    ) -> Result<Vec<Category>> {
        let items = Self::display_order(catalog, self.repository.list(catalog).await?);

        let from = items
            .iter()
            .position(|c| c.id == dragged_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("{} category {} not found", catalog, dragged_id))
            })?;

        let to = match target {
            DropTarget::Item(target_id) => {
                items.iter().position(|c| c.id == target_id).ok_or_else(|| {
                    AppError::NotFound(format!(
                        "Drop target {} not found in {} catalog",
                        target_id, catalog
                    ))
                })?
            }
            DropTarget::Index(index) => index.min(items.len().saturating_sub(1)),
        };

        let contiguous = items
            .iter()
            .enumerate()
            .all(|(position, c)| c.order == position as i64);
        if from == to && contiguous {
            tracing::debug!("Reorder of {} is a no-op", dragged_id);
            return Ok(items);
        }

        let plan = ReorderPlan::build(items, from, to);
        self.repository
            .apply_local(catalog, plan.reordered.clone())
            .await;

        let results = join_all(plan.writes.iter().map(|(id, order)| {
            self.repository
                .update(catalog, *id, CategoryPatch::order(*order))
        }))
        .await;

        let failures: Vec<AppError> = results.into_iter().filter_map(|r| r.err()).collect();
        if let Some(first) = failures.into_iter().next() {
            tracing::error!(
                "Reorder of {} category {} failed ({} writes planned): {}; discarding local order",
                catalog,
                dragged_id,
                plan.writes.len(),
                first
            );
            if let Err(e) = self.repository.refresh(catalog).await {
                tracing::error!("Failed to re-read {} catalog after reorder: {}", catalog, e);
            }
            return Err(first);
        }

        tracing::info!(
            "Reordered {} catalog: {} moved {} -> {}, {} records updated",
            catalog,
            dragged_id,
            from,
            to,
            plan.writes.len()
        );

        let refreshed = self.repository.refresh(catalog).await?;
        Ok(Self::display_order(catalog, refreshed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::models::NewCategory;
    use crate::modules::document_store::MemoryDocumentStore;
    use crate::shared::clock::SystemClock;
    use std::collections::HashSet;

    async fn seeded(names: &[&str]) -> (Arc<MemoryDocumentStore>, Arc<CategoryRepository>, Vec<Uuid>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let repo = Arc::new(CategoryRepository::new(store.clone(), Arc::new(SystemClock)));
        let mut ids = Vec::new();
        for name in names {
            let id = repo
                .create(
                    Catalog::Product,
                    NewCategory {
                        name: name.to_string(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            ids.push(id);
        }
        (store, repo, ids)
    }

    fn names(categories: &[Category]) -> Vec<&str> {
        categories.iter().map(|c| c.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_reorder_is_a_permutation_with_contiguous_orders() {
        let (_, repo, ids) = seeded(&["a", "b", "c", "d"]).await;
        let service = SequencingService::new(repo.clone());

        let result = service
            .reorder(Catalog::Product, ids[3], DropTarget::Item(ids[1]))
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["a", "d", "b", "c"]);
        let before: HashSet<Uuid> = ids.iter().copied().collect();
        let after: HashSet<Uuid> = result.iter().map(|c| c.id).collect();
        assert_eq!(before, after);
        let orders: Vec<i64> = result.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_random_drags_keep_catalog_a_permutation() {
        use fake::faker::lorem::en::Word;
        use fake::Fake;

        let words: Vec<String> = (0..(3..9).fake::<usize>())
            .map(|_| Word().fake())
            .collect();
        let word_refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let (_, repo, ids) = seeded(&word_refs).await;
        let service = SequencingService::new(repo);
        let expected: HashSet<Uuid> = ids.iter().copied().collect();

        for _ in 0..10 {
            let dragged = ids[(0..ids.len()).fake::<usize>()];
            let target = DropTarget::Index((0..ids.len() + 2).fake::<usize>());
            let result = service
                .reorder(Catalog::Product, dragged, target)
                .await
                .unwrap();

            let seen: HashSet<Uuid> = result.iter().map(|c| c.id).collect();
            assert_eq!(seen, expected);
            let orders: Vec<i64> = result.iter().map(|c| c.order).collect();
            assert_eq!(orders, (0..ids.len() as i64).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_reorder_by_index_clamps_to_end() {
        let (_, repo, ids) = seeded(&["a", "b", "c"]).await;
        let service = SequencingService::new(repo);

        let result = service
            .reorder(Catalog::Product, ids[0], DropTarget::Index(99))
            .await
            .unwrap();
        assert_eq!(names(&result), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_failed_write_discards_local_order() {
        let (store, repo, ids) = seeded(&["a", "b", "c"]).await;
        let service = SequencingService::new(repo.clone());
        store.fail_writes_for(ids[1]).await;

        let err = service
            .reorder(Catalog::Product, ids[2], DropTarget::Item(ids[0]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));

        // local state equals the authoritative store again
        let snapshot = repo.snapshot(Catalog::Product).await.unwrap();
        let authoritative = repo.list(Catalog::Product).await.unwrap();
        assert_eq!(snapshot, authoritative);
    }

    #[tokio::test]
    async fn test_drop_in_place_closes_order_gaps() {
        let (_, repo, ids) = seeded(&["a", "b", "c"]).await;
        let service = SequencingService::new(repo.clone());
        repo.delete(Catalog::Product, ids[1]).await.unwrap();

        let result = service
            .reorder(Catalog::Product, ids[0], DropTarget::Item(ids[0]))
            .await
            .unwrap();
        assert_eq!(names(&result), vec!["a", "c"]);
        let orders: Vec<i64> = result.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1]);

        let persisted = repo.get(Catalog::Product, ids[2]).await.unwrap();
        assert_eq!(persisted.order, 1);
    }

    #[tokio::test]
    async fn test_store_child_dragged_above_root() {
        let store = Arc::new(MemoryDocumentStore::new());
        let repo = Arc::new(CategoryRepository::new(store, Arc::new(SystemClock)));
        let mut created = Vec::new();
        for name in ["root-1", "root-2", "child"] {
            let id = repo
                .create(
                    Catalog::Store,
                    NewCategory {
                        name: name.to_string(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            created.push(id);
        }
        let (root_1, root_2, child) = (created[0], created[1], created[2]);
        repo.update(
            Catalog::Store,
            root_1,
            CategoryPatch {
                child_categories: Some(vec![child]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let service = SequencingService::new(repo.clone());

        let result = service
            .reorder(Catalog::Store, child, DropTarget::Item(root_1))
            .await
            .unwrap();

        // the child still sorts after the roots in the table
        assert_eq!(names(&result), vec!["root-1", "root-2", "child"]);
        let order_of = |id: Uuid| result.iter().find(|c| c.id == id).map(|c| c.order);
        assert_eq!(order_of(child), Some(0));
        assert_eq!(order_of(root_1), Some(1));
        assert_eq!(order_of(root_2), Some(2));

        let persisted = repo.list(Catalog::Store).await.unwrap();
        let persisted_order = |id: Uuid| persisted.iter().find(|c| c.id == id).map(|c| c.order);
        assert_eq!(persisted_order(child), Some(0));
        assert_eq!(persisted_order(root_1), Some(1));
        assert_eq!(persisted_order(root_2), Some(2));
    }

    #[test]
    fn test_plan_only_writes_changed_records() {
        let now = chrono::Utc::now();
        let items: Vec<Category> = (0..4)
            .map(|i| Category {
                id: Uuid::now_v7(),
                name: i.to_string(),
                icon: None,
                color: "#3B82F6".to_string(),
                is_active: true,
                courier_compatible: None,
                order: i,
                child_categories: vec![],
                product_categories: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let plan = ReorderPlan::build(items, 1, 2);
        assert_eq!(names(&plan.reordered), vec!["0", "2", "1", "3"]);
        assert_eq!(plan.writes.len(), 2);
    }
}
