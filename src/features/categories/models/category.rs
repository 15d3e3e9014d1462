use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::document_store::{PRODUCT_CATEGORIES, STORE_CATEGORIES};
use crate::shared::constants::DEFAULT_CATEGORY_COLOR;

/// One of the two independent category namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Catalog {
    /// Store categories (tree-aware, may reference product categories)
    Store,
    /// Product categories (flat)
    Product,
}

impl Catalog {
    pub const ALL: [Catalog; 2] = [Catalog::Store, Catalog::Product];

    pub fn collection(self) -> &'static str {
        match self {
            Catalog::Store => STORE_CATEGORIES,
            Catalog::Product => PRODUCT_CATEGORIES,
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Catalog::Store => write!(f, "store"),
            Catalog::Product => write!(f, "product"),
        }
    }
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

/// Stored category record
///
/// `child_categories` is the only hierarchy pointer; parents are derived.
/// `courier_compatible` and `product_categories` are only present on store
/// categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courier_compatible: Option<bool>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub child_categories: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_categories: Option<Vec<Uuid>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn is_courier_compatible(&self) -> bool {
        self.courier_compatible.unwrap_or(true)
    }
}

/// Validated fields for a category that does not exist yet
#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
    pub courier_compatible: Option<bool>,
    pub child_categories: Vec<Uuid>,
    pub product_categories: Vec<Uuid>,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Some(None)` clears the icon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_compatible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_categories: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_categories: Option<Vec<Uuid>>,
}

impl CategoryPatch {
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }
}

/// Drop repeated ids, keeping the first occurrence
pub fn unique_ids<I: IntoIterator<Item = Uuid>>(ids: I) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
