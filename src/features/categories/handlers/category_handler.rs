use std::sync::Arc;

use axum::{extract::State, Json};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppPath, AppQuery};
use crate::features::auth::guards::RequireAdmin;
use crate::features::categories::dtos::{
    AdminListQuery, CategoryListingDto, CategoryResponseDto, CreateCategoryDto, PublicListQuery,
    ReorderCategoriesDto, UpdateCategoryDto, UpdateCategoryResponseDto,
};
use crate::features::categories::models::Catalog;
use crate::features::categories::services::{CategoryService, DropTarget, SequencingService};
use crate::shared::types::{ApiResponse, Meta};

/// State for category handlers
#[derive(Clone)]
pub struct CategoryState {
    pub category_service: Arc<CategoryService>,
    pub sequencing_service: Arc<SequencingService>,
}

/// List active store categories for the storefront
///
/// Returns categories as flat list or tree structure based on `tree` query param.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(PublicListQuery),
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<CategoryListingDto>),
    ),
    tag = "categories"
)]
pub async fn list_public_categories(
    State(service): State<Arc<CategoryService>>,
    AppQuery(query): AppQuery<PublicListQuery>,
) -> Result<Json<ApiResponse<CategoryListingDto>>> {
    let listing = service.list_public(query.tree).await?;
    let meta = Meta::total(listing.count());
    Ok(Json(ApiResponse::success(Some(listing), None, Some(meta))))
}

/// List a catalog as flat records, a tree or table rows
#[utoipa::path(
    get,
    path = "/api/admin/catalogs/{catalog}/categories",
    params(
        ("catalog" = Catalog, Path, description = "Catalog: store or product"),
        AdminListQuery
    ),
    responses(
        (status = 200, description = "Catalog listing", body = ApiResponse<CategoryListingDto>),
        (status = 400, description = "Unknown catalog or view"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-categories"
)]
pub async fn list_categories(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<CategoryState>,
    AppPath(catalog): AppPath<Catalog>,
    AppQuery(query): AppQuery<AdminListQuery>,
) -> Result<Json<ApiResponse<CategoryListingDto>>> {
    let listing = state.category_service.list(catalog, query.view).await?;
    let meta = Meta::total(listing.count());
    Ok(Json(ApiResponse::success(Some(listing), None, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/admin/catalogs/{catalog}/categories",
    params(("catalog" = Catalog, Path, description = "Catalog: store or product")),
    request_body = CreateCategoryDto,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "Child list would create a cycle")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-categories"
)]
pub async fn create_category(
    RequireAdmin(user): RequireAdmin,
    State(state): State<CategoryState>,
    AppPath(catalog): AppPath<Catalog>,
    AppJson(dto): AppJson<CreateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let category = state.category_service.create(catalog, dto).await?;
    tracing::debug!("Category {} created by {}", category.id, user.sub);
    Ok(Json(ApiResponse::success(
        Some(category),
        Some("Category created successfully".to_string()),
        None,
    )))
}

/// Update a category, optionally grouping it with partners in a rule
#[utoipa::path(
    patch,
    path = "/api/admin/catalogs/{catalog}/categories/{id}",
    params(
        ("catalog" = Catalog, Path, description = "Catalog: store or product"),
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<UpdateCategoryResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Child list would create a cycle")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-categories"
)]
pub async fn update_category(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<CategoryState>,
    AppPath((catalog, id)): AppPath<(Catalog, Uuid)>,
    AppJson(dto): AppJson<UpdateCategoryDto>,
) -> Result<Json<ApiResponse<UpdateCategoryResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = state.category_service.update(catalog, id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(updated),
        Some("Category updated successfully".to_string()),
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/admin/catalogs/{catalog}/categories/{id}/toggle-active",
    params(
        ("catalog" = Catalog, Path, description = "Catalog: store or product"),
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Active flag flipped", body = ApiResponse<CategoryResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-categories"
)]
pub async fn toggle_active(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<CategoryState>,
    AppPath((catalog, id)): AppPath<(Catalog, Uuid)>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = state.category_service.toggle_active(catalog, id).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Flip courier compatibility; store categories only
#[utoipa::path(
    post,
    path = "/api/admin/catalogs/{catalog}/categories/{id}/toggle-courier",
    params(
        ("catalog" = Catalog, Path, description = "Must be store"),
        ("id" = Uuid, Path, description = "Store category ID")
    ),
    responses(
        (status = 200, description = "Courier compatibility flipped", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Not a store category"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-categories"
)]
pub async fn toggle_courier(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<CategoryState>,
    AppPath((catalog, id)): AppPath<(Catalog, Uuid)>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    if catalog != Catalog::Store {
        return Err(AppError::Validation(
            "Courier compatibility only exists on store categories".to_string(),
        ));
    }
    let category = state.category_service.toggle_courier(id).await?;
    Ok(Json(ApiResponse::success(Some(category), None, None)))
}

/// Move one category to the drop target's position and renumber the catalog
///
/// On any failed write the optimistic order is discarded and the error
/// returned; the catalog is re-read either way.
#[utoipa::path(
    post,
    path = "/api/admin/catalogs/{catalog}/categories/reorder",
    params(("catalog" = Catalog, Path, description = "Catalog: store or product")),
    request_body = ReorderCategoriesDto,
    responses(
        (status = 200, description = "Catalog in its new order", body = ApiResponse<Vec<CategoryResponseDto>>),
        (status = 400, description = "Missing or ambiguous drop target"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Dragged or target category not found"),
        (status = 500, description = "A write failed; order re-read from the store")
    ),
    security(("bearer_auth" = [])),
    tag = "admin-categories"
)]
pub async fn reorder_categories(
    RequireAdmin(_user): RequireAdmin,
    State(state): State<CategoryState>,
    AppPath(catalog): AppPath<Catalog>,
    AppJson(dto): AppJson<ReorderCategoriesDto>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let target = match (dto.target_id, dto.target_index) {
        (Some(id), None) => DropTarget::Item(id),
        (None, Some(index)) => DropTarget::Index(index),
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of targetId or targetIndex".to_string(),
            ))
        }
    };

    let ordered = state
        .sequencing_service
        .reorder(catalog, dto.dragged_id, target)
        .await?;
    let meta = Meta::total(ordered.len());
    let dtos: Vec<CategoryResponseDto> = ordered.into_iter().map(|c| c.into()).collect();
    Ok(Json(ApiResponse::success(Some(dtos), None, Some(meta))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::routes;
    use crate::features::categories::services::CategoryRepository;
    use crate::features::category_rules::RuleEngine;
    use crate::modules::document_store::{DocumentStore, MemoryDocumentStore};
    use crate::shared::clock::SystemClock;
    use crate::shared::test_helpers::{with_regular_user_auth, with_super_admin_auth};
    use axum::http::StatusCode;
    use axum::Router;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn services() -> (Arc<CategoryService>, Arc<SequencingService>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(SystemClock);
        let repository = Arc::new(CategoryRepository::new(store.clone(), clock.clone()));
        let rule_engine = Arc::new(RuleEngine::new(store, repository.clone(), clock));
        (
            Arc::new(CategoryService::new(repository.clone(), rule_engine)),
            Arc::new(SequencingService::new(repository)),
        )
    }

    fn admin_server() -> TestServer {
        let (category_service, sequencing_service) = services();
        let app = Router::new()
            .merge(routes::admin_routes(
                category_service.clone(),
                sequencing_service,
            ))
            .merge(routes::public_routes(category_service));
        TestServer::new(with_super_admin_auth(app)).unwrap()
    }

    async fn create(server: &TestServer, catalog: &str, body: Value) -> Value {
        let response = server
            .post(&format!("/api/admin/catalogs/{}/categories", catalog))
            .json(&body)
            .await;
        response.assert_status_ok();
        response.json::<Value>()["data"].clone()
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let (category_service, sequencing_service) = services();
        let app = routes::admin_routes(category_service, sequencing_service);
        let server = TestServer::new(with_regular_user_auth(app)).unwrap();

        let response = server.get("/api/admin/catalogs/store/categories").await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_and_list_tree() {
        let server = admin_server();
        let child = create(&server, "store", json!({ "name": "Phones" })).await;
        let root = create(
            &server,
            "store",
            json!({ "name": "Electronics", "childCategories": [child["id"]] }),
        )
        .await;

        let response = server
            .get("/api/admin/catalogs/store/categories")
            .add_query_param("view", "tree")
            .await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        let nodes = body["data"].as_array().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["id"], root["id"]);
        assert_eq!(nodes[0]["hasChildren"], json!(true));
        assert_eq!(nodes[0]["children"][0]["id"], child["id"]);
        assert_eq!(nodes[0]["children"][0]["level"], json!(1));
    }

    #[tokio::test]
    async fn test_unknown_catalog_is_bad_request() {
        let server = admin_server();
        let response = server.get("/api/admin/catalogs/services/categories").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_color_is_rejected() {
        let server = admin_server();
        let response = server
            .post("/api/admin/catalogs/product/categories")
            .json(&json!({ "name": "Shoes", "color": "blue" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cycle_is_conflict() {
        let server = admin_server();
        let b = create(&server, "store", json!({ "name": "B" })).await;
        let a = create(
            &server,
            "store",
            json!({ "name": "A", "childCategories": [b["id"]] }),
        )
        .await;

        let response = server
            .patch(&format!(
                "/api/admin/catalogs/store/categories/{}",
                b["id"].as_str().unwrap()
            ))
            .json(&json!({ "childCategories": [a["id"]] }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_toggle_courier_rejects_product_catalog() {
        let server = admin_server();
        let shoes = create(&server, "product", json!({ "name": "Shoes" })).await;

        let response = server
            .post(&format!(
                "/api/admin/catalogs/product/categories/{}/toggle-courier",
                shoes["id"].as_str().unwrap()
            ))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reorder_requires_one_target() {
        let server = admin_server();
        let a = create(&server, "store", json!({ "name": "A" })).await;
        let b = create(&server, "store", json!({ "name": "B" })).await;

        let ambiguous = server
            .post("/api/admin/catalogs/store/categories/reorder")
            .json(&json!({ "draggedId": a["id"], "targetId": b["id"], "targetIndex": 0 }))
            .await;
        ambiguous.assert_status(StatusCode::BAD_REQUEST);

        let moved = server
            .post("/api/admin/catalogs/store/categories/reorder")
            .json(&json!({ "draggedId": b["id"], "targetIndex": 0 }))
            .await;
        moved.assert_status_ok();
        let body = moved.json::<Value>();
        assert_eq!(body["data"][0]["id"], b["id"]);
        assert_eq!(body["meta"]["total"], json!(2));
    }

    #[tokio::test]
    async fn test_public_listing_hides_inactive() {
        let server = admin_server();
        let shown = create(&server, "store", json!({ "name": "Shown" })).await;
        create(
            &server,
            "store",
            json!({ "name": "Hidden", "isActive": false }),
        )
        .await;
        create(&server, "product", json!({ "name": "Product only" })).await;

        let response = server.get("/api/categories").await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        let items = body["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], shown["id"]);
    }
}
