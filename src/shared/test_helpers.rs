#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;

#[cfg(test)]
use crate::modules::mailer::{DeliveryChannel, DeliveryError, DeliveryPayload};

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
pub fn create_super_admin_user() -> AuthenticatedUser {
    AuthenticatedUser {
        account_id: "test-account-id".to_string(),
        sub: "test-sub".to_string(),
        email: Some("admin@example.com".to_string()),
        roles: vec!["super_admin".to_string()],
    }
}

#[cfg(test)]
pub fn create_regular_user() -> AuthenticatedUser {
    AuthenticatedUser {
        account_id: "test-account-id".to_string(),
        sub: "test-customer".to_string(),
        email: None,
        roles: vec!["customer".to_string()],
    }
}

#[cfg(test)]
async fn inject_super_admin_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_super_admin_user());
    next.run(request).await
}

#[cfg(test)]
async fn inject_regular_user_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_regular_user());
    next.run(request).await
}

#[cfg(test)]
pub fn with_super_admin_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_super_admin_middleware))
}

#[cfg(test)]
pub fn with_regular_user_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_regular_user_middleware))
}

/// Delivery channel that keeps every payload it was handed
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    sent: tokio::sync::Mutex<Vec<(String, DeliveryPayload)>>,
    fail: bool,
}

#[cfg(test)]
impl RecordingMailer {
    /// Records the payload, then reports the provider as down
    pub fn failing() -> Self {
        Self {
            sent: Default::default(),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<(String, DeliveryPayload)> {
        self.sent.lock().await.clone()
    }

    pub async fn last_code(&self) -> Option<String> {
        self.sent
            .lock()
            .await
            .last()
            .map(|(_, payload)| payload.code.clone())
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl DeliveryChannel for RecordingMailer {
    async fn send(&self, recipient: &str, payload: &DeliveryPayload) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), payload.clone()));
        if self.fail {
            return Err(DeliveryError::Rejected {
                status: 503,
                body: "mail provider unavailable".to_string(),
            });
        }
        Ok(())
    }
}
