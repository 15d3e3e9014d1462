use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{
    CategoryListingDto, CategoryResponseDto, CategoryRowDto, CategoryTreeDto, CategoryView,
    CreateCategoryDto, UpdateCategoryDto, UpdateCategoryResponseDto,
};
use crate::features::categories::models::{Catalog, Category, CategoryPatch, NewCategory};
use crate::features::categories::services::hierarchy_resolver::{
    flatten, prune_inactive, resolve_tree, table_rows, validate_children, HierarchyError,
};
use crate::features::categories::services::CategoryRepository;
use crate::features::category_rules::services::RuleEngine;
use crate::shared::validation::is_valid_icon;

impl From<HierarchyError> for AppError {
    fn from(e: HierarchyError) -> Self {
        match e {
            HierarchyError::UnknownChild(_) => AppError::Validation(e.to_string()),
            HierarchyError::SelfReference(_) | HierarchyError::Cycle { .. } => {
                AppError::Conflict(e.to_string())
            }
        }
    }
}

/// Admin and storefront operations on both catalogs
///
/// Listings are served from the repository snapshot. Every mutation is
/// followed by a full re-read of the affected catalog.
pub struct CategoryService {
    repository: Arc<CategoryRepository>,
    rule_engine: Arc<RuleEngine>,
}

impl CategoryService {
    pub fn new(repository: Arc<CategoryRepository>, rule_engine: Arc<RuleEngine>) -> Self {
        Self {
            repository,
            rule_engine,
        }
    }

    /// Read model sorted by `order`
    async fn sorted(&self, catalog: Catalog) -> Result<Vec<Category>> {
        let mut categories = self.repository.snapshot(catalog).await?;
        categories.sort_by_key(|c| c.order);
        Ok(categories)
    }

    pub async fn list(&self, catalog: Catalog, view: CategoryView) -> Result<CategoryListingDto> {
        let categories = self.sorted(catalog).await?;

        Ok(match view {
            CategoryView::Flat => {
                CategoryListingDto::Flat(categories.into_iter().map(Into::into).collect())
            }
            CategoryView::Tree => CategoryListingDto::Tree(
                resolve_tree(&categories)
                    .into_iter()
                    .map(CategoryTreeDto::from)
                    .collect(),
            ),
            CategoryView::Table => CategoryListingDto::Table(
                table_rows(&categories)
                    .into_iter()
                    .map(CategoryRowDto::from)
                    .collect(),
            ),
        })
    }

    /// Storefront listing: active store categories only
    ///
    /// The tree drops an inactive category together with its subtree.
    pub async fn list_public(&self, tree: bool) -> Result<CategoryListingDto> {
        let categories = self.sorted(Catalog::Store).await?;
        let forest = prune_inactive(resolve_tree(&categories));

        if tree {
            return Ok(CategoryListingDto::Tree(
                forest.into_iter().map(CategoryTreeDto::from).collect(),
            ));
        }

        Ok(CategoryListingDto::Flat(
            flatten(&forest)
                .into_iter()
                .map(|row| row.category.into())
                .collect(),
        ))
    }

    pub async fn create(
        &self,
        catalog: Catalog,
        dto: CreateCategoryDto,
    ) -> Result<CategoryResponseDto> {
        if catalog == Catalog::Product {
            if dto.courier_compatible.is_some() {
                return Err(store_only("courierCompatible"));
            }
            if !dto.product_categories.is_empty() {
                return Err(store_only("productCategories"));
            }
        }

        let icon = dto.icon.as_deref().and_then(normalize_icon).transpose()?;

        let existing = self.repository.list(catalog).await?;
        let child_categories = validate_children(&existing, None, &dto.child_categories)?;
        let product_categories = self.check_product_refs(&dto.product_categories).await?;

        let id = self
            .repository
            .create(
                catalog,
                NewCategory {
                    name: dto.name,
                    icon,
                    color: dto.color,
                    is_active: dto.is_active,
                    courier_compatible: dto.courier_compatible,
                    child_categories,
                    product_categories,
                },
            )
            .await?;

        self.reloaded(catalog, id).await
    }

    pub async fn update(
        &self,
        catalog: Catalog,
        id: Uuid,
        dto: UpdateCategoryDto,
    ) -> Result<UpdateCategoryResponseDto> {
        if catalog == Catalog::Product {
            if dto.courier_compatible.is_some() {
                return Err(store_only("courierCompatible"));
            }
            if dto.product_categories.is_some() {
                return Err(store_only("productCategories"));
            }
            if dto.rule.is_some() {
                return Err(store_only("rule"));
            }
        }

        self.repository.get(catalog, id).await?;

        let icon = match dto.icon.as_deref() {
            None => None,
            Some(raw) => Some(normalize_icon(raw).transpose()?),
        };

        let child_categories = match &dto.child_categories {
            Some(children) => {
                let existing = self.repository.list(catalog).await?;
                Some(validate_children(&existing, Some(id), children)?)
            }
            None => None,
        };

        let product_categories = match &dto.product_categories {
            Some(ids) => Some(self.check_product_refs(ids).await?),
            None => None,
        };

        // partners are checked up front so a bad link leaves the category untouched
        if let Some(link) = &dto.rule {
            self.rule_engine.validate_link(id, &link.partner_ids).await?;
        }

        self.repository
            .update(
                catalog,
                id,
                CategoryPatch {
                    name: dto.name,
                    icon,
                    color: dto.color,
                    is_active: dto.is_active,
                    courier_compatible: dto.courier_compatible,
                    order: None,
                    child_categories,
                    product_categories,
                },
            )
            .await?;
        tracing::info!("Updated {} category {}", catalog, id);

        let category = self.reloaded(catalog, id).await?;

        let rule = match dto.rule {
            Some(link) => {
                let edited = self.repository.get(catalog, id).await?;
                let outcome = self
                    .rule_engine
                    .merge_for_category(&edited, link.rule_type, &link.partner_ids)
                    .await?;
                Some(outcome.into())
            }
            None => None,
        };

        Ok(UpdateCategoryResponseDto { category, rule })
    }

    pub async fn toggle_active(&self, catalog: Catalog, id: Uuid) -> Result<CategoryResponseDto> {
        let category = self.repository.get(catalog, id).await?;
        self.repository
            .update(
                catalog,
                id,
                CategoryPatch {
                    is_active: Some(!category.is_active),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(
            "Toggled {} category {} active: {} -> {}",
            catalog,
            id,
            category.is_active,
            !category.is_active
        );

        self.reloaded(catalog, id).await
    }

    /// Store categories only
    pub async fn toggle_courier(&self, id: Uuid) -> Result<CategoryResponseDto> {
        let category = self.repository.get(Catalog::Store, id).await?;
        let next = !category.is_courier_compatible();
        self.repository
            .update(
                Catalog::Store,
                id,
                CategoryPatch {
                    courier_compatible: Some(next),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!("Set store category {} courier compatibility to {}", id, next);

        self.reloaded(Catalog::Store, id).await
    }

    /// Re-read the catalog after a write and return the touched record
    async fn reloaded(&self, catalog: Catalog, id: Uuid) -> Result<CategoryResponseDto> {
        self.repository
            .refresh(catalog)
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("{} category {} not found", catalog, id)))
    }

    /// Every referenced product category must exist
    async fn check_product_refs(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let known: HashSet<Uuid> = self
            .repository
            .list(Catalog::Product)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let mut seen = HashSet::new();
        let mut refs = Vec::new();
        for id in ids {
            if !known.contains(id) {
                return Err(AppError::Validation(format!(
                    "Product category {} does not exist",
                    id
                )));
            }
            if seen.insert(*id) {
                refs.push(*id);
            }
        }
        Ok(refs)
    }
}

fn store_only(field: &str) -> AppError {
    AppError::Validation(format!("{} is only allowed on store categories", field))
}

/// `None` for a blank icon (clears it), otherwise the checked reference
fn normalize_icon(raw: &str) -> Option<Result<String>> {
    let icon = raw.trim();
    if icon.is_empty() {
        return None;
    }
    if !is_valid_icon(icon) {
        return Some(Err(AppError::Validation(format!(
            "Icon '{}' is neither an icon name nor an http(s) URL",
            icon
        ))));
    }
    Some(Ok(icon.to_string()))
}
