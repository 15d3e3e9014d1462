use async_trait::async_trait;

use super::{DeliveryChannel, DeliveryError, DeliveryPayload};

/// Development channel that writes the message to the log
pub struct LogMailer;

#[async_trait]
impl DeliveryChannel for LogMailer {
    async fn send(&self, recipient: &str, payload: &DeliveryPayload) -> Result<(), DeliveryError> {
        tracing::warn!(
            recipient = recipient,
            code = %payload.code,
            action = %payload.action_description,
            items = payload.item_count,
            expires_at = %payload.expires_at,
            "No mailer endpoint configured; Superpass code logged instead of sent"
        );
        Ok(())
    }
}
