use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::superpass::models::{AuthorizationToken, SuperpassAction, TokenStatus};
use crate::features::superpass::services::VerifiedAction;

/// Request DTO for a delete intent
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueSuperpassDto {
    pub action: SuperpassAction,

    #[validate(length(min = 1, message = "Select at least one category to delete"))]
    pub target_ids: Vec<Uuid>,
}

/// Issued token as returned to the requester; the code only travels out of band
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuperpassIssuedDto {
    pub id: Uuid,
    pub action: SuperpassAction,
    pub target_count: usize,
    pub status: TokenStatus,
    pub expires_at: DateTime<Utc>,
}

impl From<AuthorizationToken> for SuperpassIssuedDto {
    fn from(t: AuthorizationToken) -> Self {
        Self {
            id: t.id,
            action: t.action,
            target_count: t.target_ids.len(),
            status: t.status,
            expires_at: t.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySuperpassDto {
    #[validate(length(min = 1, max = 64, message = "Code must be 1-64 characters"))]
    pub code: String,
}

/// What a verified code deleted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuperpassVerifiedDto {
    pub token_id: Uuid,
    pub action: SuperpassAction,
    pub deleted_ids: Vec<Uuid>,
}

impl From<VerifiedAction> for SuperpassVerifiedDto {
    fn from(v: VerifiedAction) -> Self {
        Self {
            token_id: v.token_id,
            action: v.action,
            deleted_ids: v.deleted_ids,
        }
    }
}
