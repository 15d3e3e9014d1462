use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::categories::models::Catalog;
use crate::shared::constants::SUPERPASS_ALPHABET;

/// Destructive action a token authorizes: catalog plus cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SuperpassAction {
    /// One store category
    Single,
    /// Several store categories in one batch
    Bulk,
    /// One product category
    SingleProduct,
    /// Several product categories in one batch
    BulkProduct,
}

impl SuperpassAction {
    pub fn catalog(self) -> Catalog {
        match self {
            SuperpassAction::Single | SuperpassAction::Bulk => Catalog::Store,
            SuperpassAction::SingleProduct | SuperpassAction::BulkProduct => Catalog::Product,
        }
    }

    pub fn is_bulk(self) -> bool {
        matches!(self, SuperpassAction::Bulk | SuperpassAction::BulkProduct)
    }

    /// Human-readable line for the delivery message
    pub fn describe(self, count: usize) -> String {
        match self {
            SuperpassAction::Single => "Delete one store category".to_string(),
            SuperpassAction::Bulk => format!("Bulk delete of {} store categories", count),
            SuperpassAction::SingleProduct => "Delete one product category".to_string(),
            SuperpassAction::BulkProduct => {
                format!("Bulk delete of {} product categories", count)
            }
        }
    }
}

impl fmt::Display for SuperpassAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuperpassAction::Single => write!(f, "single"),
            SuperpassAction::Bulk => write!(f, "bulk"),
            SuperpassAction::SingleProduct => write!(f, "single-product"),
            SuperpassAction::BulkProduct => write!(f, "bulk-product"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Issued,
    Verified,
    Expired,
}

/// Why a presented code was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("Invalid Superpass code")]
    Mismatch,

    #[error("Superpass code has already been used")]
    AlreadyUsed,

    #[error("Superpass code has expired")]
    Expired,
}

/// Stored one-time authorization for a delete
///
/// The action and its targets are fixed at issue time and never re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationToken {
    pub id: Uuid,
    pub code: String,
    pub action: SuperpassAction,
    pub target_ids: Vec<Uuid>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub used: bool,
    #[serde(default = "default_status")]
    pub status: TokenStatus,
    pub recipient: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

fn default_status() -> TokenStatus {
    TokenStatus::Issued
}

impl AuthorizationToken {
    /// Accept iff the code matches, the token is unused and `now < expiresAt`
    pub fn check(&self, code: &str, now: DateTime<Utc>) -> Result<(), TokenRejection> {
        if self.code != code {
            return Err(TokenRejection::Mismatch);
        }
        if self.used || self.status == TokenStatus::Verified {
            return Err(TokenRejection::AlreadyUsed);
        }
        if self.status == TokenStatus::Expired || now >= self.expires_at {
            return Err(TokenRejection::Expired);
        }
        Ok(())
    }

    /// Issued, unused and past its window
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TokenStatus::Issued && !self.used && now >= self.expires_at
    }
}

/// Random code of `length` characters from `A-Z0-9`
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| SUPERPASS_ALPHABET[rng.gen_range(0..SUPERPASS_ALPHABET.len())] as char)
        .collect()
}
