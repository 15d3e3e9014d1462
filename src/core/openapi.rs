use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::categories::{
    dtos as categories_dtos, handlers as categories_handlers, models as categories_models,
};
use crate::features::category_rules::{
    dtos as rules_dtos, handlers as rules_handlers, models as rules_models,
};
use crate::features::superpass::{
    dtos as superpass_dtos, handlers as superpass_handlers, models as superpass_models,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories (public)
        categories_handlers::list_public_categories,
        // Categories (admin)
        categories_handlers::list_categories,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::toggle_active,
        categories_handlers::toggle_courier,
        categories_handlers::reorder_categories,
        // Category rules
        rules_handlers::list_rules,
        rules_handlers::create_rule,
        rules_handlers::update_rule,
        rules_handlers::delete_rule,
        // Superpass
        superpass_handlers::issue_superpass,
        superpass_handlers::verify_superpass,
    ),
    components(
        schemas(
            // Shared
            Meta,
            auth::model::AuthenticatedUser,
            // Categories
            categories_models::Catalog,
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryTreeDto,
            categories_dtos::CategoryRowDto,
            categories_dtos::CategoryView,
            categories_dtos::CategoryListingDto,
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::RuleLinkDto,
            categories_dtos::UpdateCategoryResponseDto,
            categories_dtos::RuleLinkResultDto,
            categories_dtos::ReorderCategoriesDto,
            ApiResponse<categories_dtos::CategoryListingDto>,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<categories_dtos::UpdateCategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            // Category rules
            rules_models::RuleType,
            rules_models::RuleMergeEntry,
            rules_dtos::CategoryRuleResponseDto,
            rules_dtos::CreateRuleDto,
            rules_dtos::UpdateRuleDto,
            ApiResponse<rules_dtos::CategoryRuleResponseDto>,
            ApiResponse<Vec<rules_dtos::CategoryRuleResponseDto>>,
            // Superpass
            superpass_models::SuperpassAction,
            superpass_models::TokenStatus,
            superpass_dtos::IssueSuperpassDto,
            superpass_dtos::SuperpassIssuedDto,
            superpass_dtos::VerifySuperpassDto,
            superpass_dtos::SuperpassVerifiedDto,
            ApiResponse<superpass_dtos::SuperpassIssuedDto>,
            ApiResponse<superpass_dtos::SuperpassVerifiedDto>,
        )
    ),
    tags(
        (name = "categories", description = "Active store categories (public)"),
        (name = "admin-categories", description = "Store and product catalog administration"),
        (name = "admin-category-rules", description = "Groupings of related store categories"),
        (name = "admin-superpass", description = "Out-of-band authorization for category deletes"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Marketplace Catalog API",
        version = "0.1.0",
        description = "API documentation for the marketplace catalog",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
