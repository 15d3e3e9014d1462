//! Message templates rendered with Jinja2 syntax.
//!
//! Templates are compiled into the binary so a deployment cannot lose them;
//! names mirror their path below `templates/`.

use minijinja::Environment;
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

/// Body of the Superpass authorization e-mail
pub const SUPERPASS_EMAIL: &str = "email/superpass.jinja";

static TEMPLATE_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

fn init_environment() -> Environment<'static> {
    let mut env = Environment::new();

    if let Err(e) = env.add_template(
        SUPERPASS_EMAIL,
        include_str!("../../templates/email/superpass.jinja"),
    ) {
        tracing::warn!("Failed to load template {}: {}", SUPERPASS_EMAIL, e);
    }

    env
}

fn get_environment() -> &'static Environment<'static> {
    TEMPLATE_ENV.get_or_init(init_environment)
}

/// Render a template with any serializable context
pub fn render_template<C: Serialize>(template_name: &str, ctx: &C) -> Result<String, TemplateError> {
    let template = get_environment()
        .get_template(template_name)
        .map_err(|_| TemplateError::NotFound(template_name.to_string()))?;

    template
        .render(ctx)
        .map_err(|e| TemplateError::RenderError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_superpass_email() {
        let body = render_template(
            SUPERPASS_EMAIL,
            &json!({
                "code": "AB12CD34",
                "action_description": "Delete 2 store categories",
                "item_count": 2,
                "expires_at": "2026-01-01T00:00:30Z",
                "ttl_secs": 30,
            }),
        )
        .unwrap();

        assert!(body.contains("AB12CD34"));
        assert!(body.contains("Delete 2 store categories"));
        assert!(body.contains("Affected items: 2"));
    }

    #[test]
    fn test_unknown_template() {
        let err = render_template("email/missing.jinja", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }
}
