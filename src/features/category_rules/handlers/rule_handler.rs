use std::sync::Arc;

use axum::{extract::State, Json};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppPath};
use crate::features::auth::guards::RequireAdmin;
use crate::features::category_rules::dtos::{CategoryRuleResponseDto, CreateRuleDto, UpdateRuleDto};
use crate::features::category_rules::services::RuleEngine;
use crate::shared::types::{ApiResponse, Meta};

#[utoipa::path(
    get,
    path = "/api/admin/category-rules",
    responses(
        (status = 200, description = "All category rules, oldest first", body = ApiResponse<Vec<CategoryRuleResponseDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-category-rules"
)]
pub async fn list_rules(
    RequireAdmin(_user): RequireAdmin,
    State(engine): State<Arc<RuleEngine>>,
) -> Result<Json<ApiResponse<Vec<CategoryRuleResponseDto>>>> {
    let rules = engine.list().await?;
    let meta = Meta::total(rules.len());
    let dtos: Vec<CategoryRuleResponseDto> = rules.into_iter().map(|r| r.into()).collect();
    Ok(Json(ApiResponse::success(Some(dtos), None, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/admin/category-rules",
    request_body = CreateRuleDto,
    responses(
        (status = 200, description = "Rule created", body = ApiResponse<CategoryRuleResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-category-rules"
)]
pub async fn create_rule(
    RequireAdmin(_user): RequireAdmin,
    State(engine): State<Arc<RuleEngine>>,
    AppJson(dto): AppJson<CreateRuleDto>,
) -> Result<Json<ApiResponse<CategoryRuleResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let rule = engine.create_rule(dto.into()).await?;
    Ok(Json(ApiResponse::success(
        Some(rule.into()),
        Some("Category rule created successfully".to_string()),
        None,
    )))
}

#[utoipa::path(
    patch,
    path = "/api/admin/category-rules/{id}",
    params(("id" = Uuid, Path, description = "Rule ID")),
    request_body = UpdateRuleDto,
    responses(
        (status = 200, description = "Rule updated", body = ApiResponse<CategoryRuleResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Rule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-category-rules"
)]
pub async fn update_rule(
    RequireAdmin(_user): RequireAdmin,
    State(engine): State<Arc<RuleEngine>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(dto): AppJson<UpdateRuleDto>,
) -> Result<Json<ApiResponse<CategoryRuleResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let rule = engine.edit_rule(id, dto.into()).await?;
    Ok(Json(ApiResponse::success(
        Some(rule.into()),
        Some("Category rule updated successfully".to_string()),
        None,
    )))
}

/// Delete a rule; the categories it grouped are left alone
#[utoipa::path(
    delete,
    path = "/api/admin/category-rules/{id}",
    params(("id" = Uuid, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Rule deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Rule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-category-rules"
)]
pub async fn delete_rule(
    RequireAdmin(user): RequireAdmin,
    State(engine): State<Arc<RuleEngine>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    engine.delete_rule(id).await?;
    tracing::debug!("Category rule {} deleted by {}", id, user.sub);
    Ok(Json(ApiResponse::success(
        None,
        Some("Category rule deleted successfully".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::models::{Catalog, NewCategory};
    use crate::features::categories::CategoryRepository;
    use crate::features::category_rules::routes;
    use crate::modules::document_store::MemoryDocumentStore;
    use crate::shared::clock::SystemClock;
    use crate::shared::test_helpers::{with_regular_user_auth, with_super_admin_auth};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn engine() -> (Arc<RuleEngine>, Arc<CategoryRepository>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(SystemClock);
        let repository = Arc::new(CategoryRepository::new(store.clone(), clock.clone()));
        (
            Arc::new(RuleEngine::new(store, repository.clone(), clock)),
            repository,
        )
    }

    async fn categories(repository: &CategoryRepository, names: &[&str]) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for name in names {
            let id = repository
                .create(
                    Catalog::Store,
                    NewCategory {
                        name: name.to_string(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            ids.push(id);
        }
        ids
    }

    #[tokio::test]
    async fn test_rule_lifecycle() {
        let (engine, repository) = engine();
        let ids = categories(&repository, &["Tents", "Stoves", "Lanterns"]).await;
        let server = TestServer::new(with_super_admin_auth(routes::routes(engine))).unwrap();

        let created = server
            .post("/api/admin/category-rules")
            .json(&json!({
                "name": "Camping",
                "categoryIds": [ids[0], ids[1]],
                "ruleType": "cross-display"
            }))
            .await;
        created.assert_status_ok();
        let rule_id = created.json::<Value>()["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let updated = server
            .patch(&format!("/api/admin/category-rules/{}", rule_id))
            .json(&json!({ "categoryIds": [ids[0], ids[1], ids[2]] }))
            .await;
        updated.assert_status_ok();
        assert_eq!(
            updated.json::<Value>()["data"]["categoryIds"]
                .as_array()
                .unwrap()
                .len(),
            3
        );

        server
            .delete(&format!("/api/admin/category-rules/{}", rule_id))
            .await
            .assert_status_ok();

        let listed = server.get("/api/admin/category-rules").await;
        listed.assert_status_ok();
        assert_eq!(listed.json::<Value>()["meta"]["total"], json!(0));
    }

    #[tokio::test]
    async fn test_single_category_rule_is_rejected() {
        let (engine, repository) = engine();
        let ids = categories(&repository, &["Solo"]).await;
        let server = TestServer::new(with_super_admin_auth(routes::routes(engine))).unwrap();

        let response = server
            .post("/api/admin/category-rules")
            .json(&json!({
                "name": "Lonely",
                "categoryIds": [ids[0]],
                "ruleType": "parent-child"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_customer_cannot_list_rules() {
        let (engine, _) = engine();
        let server = TestServer::new(with_regular_user_auth(routes::routes(engine))).unwrap();

        server
            .get("/api/admin/category-rules")
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
