use async_trait::async_trait;
use serde_json::json;

use super::{DeliveryChannel, DeliveryError, DeliveryPayload};
use crate::core::config::MailerConfig;
use crate::shared::templates::{render_template, SUPERPASS_EMAIL};

/// Sends messages through a transactional e-mail HTTP API
pub struct HttpMailer {
    endpoint: String,
    service_id: String,
    template_id: String,
    public_key: String,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(config: &MailerConfig, endpoint: String) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        Ok(Self {
            endpoint,
            service_id: config.service_id.clone(),
            template_id: config.template_id.clone(),
            public_key: config.public_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl DeliveryChannel for HttpMailer {
    async fn send(&self, recipient: &str, payload: &DeliveryPayload) -> Result<(), DeliveryError> {
        let message = render_template(SUPERPASS_EMAIL, payload)
            .map_err(|e| DeliveryError::Render(e.to_string()))?;

        let body = json!({
            "service_id": self.service_id,
            "template_id": self.template_id,
            "user_id": self.public_key,
            "template_params": {
                "to_email": recipient,
                "superpass_code": payload.code,
                "action_description": payload.action_description,
                "item_count": payload.item_count,
                "expires_at": payload.expires_at.to_rfc3339(),
                "message": message,
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status, body });
        }

        tracing::info!(
            recipient = recipient,
            items = payload.item_count,
            "Superpass code dispatched"
        );
        Ok(())
    }
}
