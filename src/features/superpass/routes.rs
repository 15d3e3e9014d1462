use std::sync::Arc;

use axum::{routing::post, Router};

use crate::features::superpass::handlers;
use crate::features::superpass::services::SuperpassService;

/// Create routes for the Superpass feature (admin only)
pub fn routes(service: Arc<SuperpassService>) -> Router {
    Router::new()
        .route("/api/admin/superpass", post(handlers::issue_superpass))
        .route(
            "/api/admin/superpass/verify",
            post(handlers::verify_superpass),
        )
        .with_state(service)
}
