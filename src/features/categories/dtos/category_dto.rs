use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::Category;
use crate::features::categories::services::{CategoryNode, FlatNode};
use crate::features::category_rules::dtos::CategoryRuleResponseDto;
use crate::features::category_rules::models::RuleType;
use crate::features::category_rules::services::RuleMergeOutcome;

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub color: String,
    pub is_active: bool,
    /// Store categories only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_compatible: Option<bool>,
    pub order: i64,
    pub child_categories: Vec<Uuid>,
    /// Store categories only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_categories: Option<Vec<Uuid>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            icon: c.icon,
            color: c.color,
            is_active: c.is_active,
            courier_compatible: c.courier_compatible,
            order: c.order,
            child_categories: c.child_categories,
            product_categories: c.product_categories,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Response DTO for category tree (hierarchical structure)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    #[serde(flatten)]
    pub category: CategoryResponseDto,
    pub level: usize,
    pub has_children: bool,
    pub children: Vec<CategoryTreeDto>,
}

impl From<CategoryNode> for CategoryTreeDto {
    fn from(node: CategoryNode) -> Self {
        Self {
            category: node.category.into(),
            level: node.level,
            has_children: node.has_children,
            children: node.children.into_iter().map(Self::from).collect(),
        }
    }
}

/// One row of a flat listing that still carries its tree position
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRowDto {
    #[serde(flatten)]
    pub category: CategoryResponseDto,
    pub level: usize,
    pub has_children: bool,
}

impl From<FlatNode> for CategoryRowDto {
    fn from(row: FlatNode) -> Self {
        Self {
            category: row.category.into(),
            level: row.level,
            has_children: row.has_children,
        }
    }
}

/// Shape of an admin listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CategoryView {
    /// Records as stored, sorted by `order`
    #[default]
    Flat,
    /// Nested forest
    Tree,
    /// Roots first, then children; what drag-and-drop operates on
    Table,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminListQuery {
    #[serde(default)]
    pub view: CategoryView,
}

/// Query params for the public listing
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicListQuery {
    /// If true, return tree structure. Default: false (flat list)
    #[serde(default)]
    pub tree: bool,
}

/// Admin listing in the requested shape
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum CategoryListingDto {
    Flat(Vec<CategoryResponseDto>),
    Tree(Vec<CategoryTreeDto>),
    Table(Vec<CategoryRowDto>),
}

impl CategoryListingDto {
    pub fn count(&self) -> usize {
        match self {
            CategoryListingDto::Flat(rows) => rows.len(),
            CategoryListingDto::Tree(nodes) => nodes.len(),
            CategoryListingDto::Table(rows) => rows.len(),
        }
    }
}

/// Request DTO for creating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryDto {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,

    /// Icon identifier (e.g. `shopping-bag`) or absolute image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[validate(regex(
        path = "*crate::shared::validation::HEX_COLOR_REGEX",
        message = "Color must be a hex value like #3B82F6"
    ))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    /// Store categories only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_compatible: Option<bool>,

    #[serde(default)]
    pub child_categories: Vec<Uuid>,

    /// Store categories only
    #[serde(default)]
    pub product_categories: Vec<Uuid>,
}

/// Grouping requested alongside a category edit
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleLinkDto {
    pub rule_type: RuleType,

    #[validate(length(min = 1, message = "At least one partner category is required"))]
    pub partner_ids: Vec<Uuid>,
}

/// Request DTO for updating a category
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Empty string clears the icon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[validate(regex(
        path = "*crate::shared::validation::HEX_COLOR_REGEX",
        message = "Color must be a hex value like #3B82F6"
    ))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_compatible: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_categories: Option<Vec<Uuid>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_categories: Option<Vec<Uuid>>,

    /// Store catalog only: group this category with partners in a rule
    #[validate(nested)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleLinkDto>,
}

/// Result of a category edit, including any rule it touched
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryResponseDto {
    pub category: CategoryResponseDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleLinkResultDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleLinkResultDto {
    /// False when a new rule was created
    pub merged: bool,
    pub rule: CategoryRuleResponseDto,
    pub absorbed_rule_ids: Vec<Uuid>,
}

impl From<RuleMergeOutcome> for RuleLinkResultDto {
    fn from(outcome: RuleMergeOutcome) -> Self {
        match outcome {
            RuleMergeOutcome::Created(rule) => Self {
                merged: false,
                rule: rule.into(),
                absorbed_rule_ids: vec![],
            },
            RuleMergeOutcome::Merged { rule, absorbed } => Self {
                merged: true,
                rule: rule.into(),
                absorbed_rule_ids: absorbed,
            },
        }
    }
}

/// Drag-and-drop request; exactly one of `targetId` / `targetIndex`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderCategoriesDto {
    pub dragged_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_index: Option<usize>,
}
