use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};

use crate::features::category_rules::handlers;
use crate::features::category_rules::services::RuleEngine;

/// Create routes for the category rules feature
///
/// Admin only; the caller layers the auth middleware on top
pub fn routes(engine: Arc<RuleEngine>) -> Router {
    Router::new()
        .route(
            "/api/admin/category-rules",
            get(handlers::list_rules).post(handlers::create_rule),
        )
        .route(
            "/api/admin/category-rules/{id}",
            patch(handlers::update_rule).delete(handlers::delete_rule),
        )
        .with_state(engine)
}
