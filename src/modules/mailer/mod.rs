//! Out-of-band delivery of Superpass codes
//!
//! Codes never travel back through the API that requested them; they are
//! handed to a delivery channel addressed to a fixed administrative recipient.

mod http_mailer;
mod log_mailer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use http_mailer::HttpMailer;
pub use log_mailer::LogMailer;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Delivery request failed: {0}")]
    Request(String),

    #[error("Delivery rejected by provider: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to render message: {0}")]
    Render(String),
}

/// Everything the recipient needs to act on an authorization request
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryPayload {
    pub code: String,
    pub action_description: String,
    pub item_count: usize,
    pub expires_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Dispatch once; failures are reported, never retried
    async fn send(&self, recipient: &str, payload: &DeliveryPayload) -> Result<(), DeliveryError>;
}
