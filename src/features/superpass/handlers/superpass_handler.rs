use std::sync::Arc;

use axum::{extract::State, Json};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireAdmin;
use crate::features::superpass::dtos::{
    IssueSuperpassDto, SuperpassIssuedDto, SuperpassVerifiedDto, VerifySuperpassDto,
};
use crate::features::superpass::services::SuperpassService;
use crate::shared::types::ApiResponse;

/// Request a Superpass for a delete
///
/// The code is sent to the administrative mailbox, never returned here.
#[utoipa::path(
    post,
    path = "/api/admin/superpass",
    request_body = IssueSuperpassDto,
    responses(
        (status = 200, description = "Token issued and code dispatched", body = ApiResponse<SuperpassIssuedDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 502, description = "Code could not be delivered; the token stays valid")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-superpass"
)]
pub async fn issue_superpass(
    RequireAdmin(user): RequireAdmin,
    State(service): State<Arc<SuperpassService>>,
    AppJson(dto): AppJson<IssueSuperpassDto>,
) -> Result<Json<ApiResponse<SuperpassIssuedDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let token = service.issue(dto.action, &dto.target_ids).await?;
    tracing::info!("Superpass {} requested by {}", token.id, user.sub);
    Ok(Json(ApiResponse::success(
        Some(token.into()),
        Some("Superpass code sent".to_string()),
        None,
    )))
}

/// Verify a Superpass code and run the delete it authorizes
#[utoipa::path(
    post,
    path = "/api/admin/superpass/verify",
    request_body = VerifySuperpassDto,
    responses(
        (status = 200, description = "Code accepted; categories deleted", body = ApiResponse<SuperpassVerifiedDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Code invalid, used or expired"),
        (status = 500, description = "Delete failed; token released")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-superpass"
)]
pub async fn verify_superpass(
    RequireAdmin(user): RequireAdmin,
    State(service): State<Arc<SuperpassService>>,
    AppJson(dto): AppJson<VerifySuperpassDto>,
) -> Result<Json<ApiResponse<SuperpassVerifiedDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let verified = service.verify(&dto.code).await?;
    tracing::info!("Superpass {} verified by {}", verified.token_id, user.sub);
    Ok(Json(ApiResponse::success(
        Some(verified.into()),
        Some("Categories deleted successfully".to_string()),
        None,
    )))
}
