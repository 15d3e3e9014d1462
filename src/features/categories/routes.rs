use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::features::categories::handlers::{self, CategoryState};
use crate::features::categories::services::{CategoryService, SequencingService};

/// Public storefront routes (no authentication required)
pub fn public_routes(category_service: Arc<CategoryService>) -> Router {
    Router::new()
        .route("/api/categories", get(handlers::list_public_categories))
        .with_state(category_service)
}

/// Catalog administration routes
///
/// The caller layers the auth middleware on top; handlers check the role.
pub fn admin_routes(
    category_service: Arc<CategoryService>,
    sequencing_service: Arc<SequencingService>,
) -> Router {
    let state = CategoryState {
        category_service,
        sequencing_service,
    };

    Router::new()
        .route(
            "/api/admin/catalogs/{catalog}/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        // reorder must come before the {id} routes
        .route(
            "/api/admin/catalogs/{catalog}/categories/reorder",
            post(handlers::reorder_categories),
        )
        .route(
            "/api/admin/catalogs/{catalog}/categories/{id}",
            patch(handlers::update_category),
        )
        .route(
            "/api/admin/catalogs/{catalog}/categories/{id}/toggle-active",
            post(handlers::toggle_active),
        )
        .route(
            "/api/admin/catalogs/{catalog}/categories/{id}/toggle-courier",
            post(handlers::toggle_courier),
        )
        .with_state(state)
}
