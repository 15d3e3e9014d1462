use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Relationship a rule declares between its categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RuleType {
    /// Hierarchical grouping, independent of `childCategories`
    ParentChild,
    /// Products surface under every listed category at once
    CrossDisplay,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::ParentChild => write!(f, "parent-child"),
            RuleType::CrossDisplay => write!(f, "cross-display"),
        }
    }
}

/// What a rule looked like before an overlapping grouping was folded in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleMergeEntry {
    pub previous_category_ids: Vec<Uuid>,
    pub previous_rule_type: RuleType,
    pub incoming_category_ids: Vec<Uuid>,
    /// Other overlapping rules deleted by this merge
    #[serde(default)]
    pub absorbed_rule_ids: Vec<Uuid>,
    pub merged_at: DateTime<Utc>,
}

/// Stored category rule (store catalog only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRule {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_ids: Vec<Uuid>,
    pub rule_type: RuleType,
    #[serde(default)]
    pub merge_history: Vec<RuleMergeEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryRule {
    /// Two rules overlap when their category sets intersect
    pub fn overlaps(&self, ids: &[Uuid]) -> bool {
        let own: HashSet<&Uuid> = self.category_ids.iter().collect();
        ids.iter().any(|id| own.contains(id))
    }
}

/// Fields for an explicitly created rule
#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub description: String,
    pub category_ids: Vec<Uuid>,
    pub rule_type: RuleType,
}

/// Partial rule update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<RuleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_history: Option<Vec<RuleMergeEntry>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_type_is_kebab_case() {
        assert_eq!(
            serde_json::to_value(RuleType::CrossDisplay).unwrap(),
            json!("cross-display")
        );
        let parsed: RuleType = serde_json::from_value(json!("parent-child")).unwrap();
        assert_eq!(parsed, RuleType::ParentChild);
    }

    #[test]
    fn test_overlap_is_set_intersection() {
        let (a, b, c) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let now = Utc::now();
        let rule = CategoryRule {
            id: Uuid::now_v7(),
            name: "r".to_string(),
            description: String::new(),
            category_ids: vec![a, b],
            rule_type: RuleType::ParentChild,
            merge_history: vec![],
            created_at: now,
            updated_at: now,
        };

        assert!(rule.overlaps(&[c, b]));
        assert!(!rule.overlaps(&[c]));
    }
}
