use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::category_rules::models::{
    CategoryRule, NewRule, RuleMergeEntry, RulePatch, RuleType,
};

/// Response DTO for category rule
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRuleResponseDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category_ids: Vec<Uuid>,
    pub rule_type: RuleType,
    pub merge_history: Vec<RuleMergeEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryRule> for CategoryRuleResponseDto {
    fn from(r: CategoryRule) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            category_ids: r.category_ids,
            rule_type: r.rule_type,
            merge_history: r.merge_history,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Request DTO for creating a rule
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleDto {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// At least two store category ids
    #[validate(length(min = 2, message = "A rule needs at least 2 categories"))]
    pub category_ids: Vec<Uuid>,

    pub rule_type: RuleType,
}

impl From<CreateRuleDto> for NewRule {
    fn from(dto: CreateRuleDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            category_ids: dto.category_ids,
            rule_type: dto.rule_type,
        }
    }
}

/// Request DTO for updating a rule
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleDto {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[validate(length(min = 2, message = "A rule needs at least 2 categories"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<Uuid>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<RuleType>,
}

impl From<UpdateRuleDto> for RulePatch {
    fn from(dto: UpdateRuleDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            category_ids: dto.category_ids,
            rule_type: dto.rule_type,
            merge_history: None,
        }
    }
}
