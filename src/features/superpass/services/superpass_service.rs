use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::config::SuperpassConfig;
use crate::core::error::{AppError, Result};
use crate::features::categories::models::{unique_ids, Catalog};
use crate::features::categories::services::CategoryRepository;
use crate::features::superpass::models::{
    generate_code, AuthorizationToken, SuperpassAction, TokenRejection, TokenStatus,
};
use crate::modules::document_store::{encode, DocumentStore, SUPERPASS_TOKENS};
use crate::modules::mailer::{DeliveryChannel, DeliveryPayload};
use crate::shared::clock::Clock;

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedAction {
    pub token_id: Uuid,
    pub action: SuperpassAction,
    pub deleted_ids: Vec<Uuid>,
}

/// Deferred authorization for deletes
///
/// `Issued -> {Verified, Expired}`; both end states are terminal.
pub struct SuperpassService {
    store: Arc<dyn DocumentStore>,
    repository: Arc<CategoryRepository>,
    mailer: Arc<dyn DeliveryChannel>,
    clock: Arc<dyn Clock>,
    config: SuperpassConfig,
    /// Serializes check-and-claim so one code authorizes one delete
    verify_lock: Mutex<()>,
}

impl SuperpassService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        repository: Arc<CategoryRepository>,
        mailer: Arc<dyn DeliveryChannel>,
        clock: Arc<dyn Clock>,
        config: SuperpassConfig,
    ) -> Self {
        Self {
            store,
            repository,
            mailer,
            clock,
            config,
            verify_lock: Mutex::new(()),
        }
    }

    /// Persist a token for `action` over `target_ids` and dispatch its code
    ///
    /// A delivery failure is reported but the stored token stays valid for
    /// its window.
    pub async fn issue(
        &self,
        action: SuperpassAction,
        target_ids: &[Uuid],
    ) -> Result<AuthorizationToken> {
        let target_ids = unique_ids(target_ids.iter().copied());
        match (action.is_bulk(), target_ids.len()) {
            (_, 0) => {
                return Err(AppError::Validation(
                    "Select at least one category to delete".to_string(),
                ))
            }
            (false, n) if n > 1 => {
                return Err(AppError::Validation(format!(
                    "Action '{}' takes exactly one category, got {}",
                    action, n
                )))
            }
            _ => {}
        }

        let catalog = action.catalog();
        self.check_targets_exist(catalog, &target_ids).await?;

        let ttl = chrono::Duration::from_std(self.config.ttl)
            .map_err(|e| AppError::Internal(format!("Invalid Superpass window: {}", e)))?;
        let now = self.clock.now();

        let mut token = AuthorizationToken {
            id: Uuid::nil(),
            code: generate_code(self.config.code_length),
            action,
            target_ids,
            expires_at: now + ttl,
            used: false,
            status: TokenStatus::Issued,
            recipient: self.config.recipient.clone(),
            created_at: now,
            verified_at: None,
        };
        token.id = self.store.create(SUPERPASS_TOKENS, encode(&token)?).await?;

        tracing::info!(
            "Issued Superpass token {}: action={}, targets={}, expires_at={}",
            token.id,
            token.action,
            token.target_ids.len(),
            token.expires_at
        );

        let payload = DeliveryPayload {
            code: token.code.clone(),
            action_description: action.describe(token.target_ids.len()),
            item_count: token.target_ids.len(),
            expires_at: token.expires_at,
            ttl_secs: self.config.ttl.as_secs(),
        };

        if let Err(e) = self.mailer.send(&token.recipient, &payload).await {
            tracing::error!(
                "Failed to deliver Superpass token {} to {}: {}",
                token.id,
                token.recipient,
                e
            );
            return Err(e.into());
        }

        Ok(token)
    }

    /// Check `code`, run the stored delete and consume the token
    pub async fn verify(&self, code: &str) -> Result<VerifiedAction> {
        let code = code.trim();
        let _guard = self.verify_lock.lock().await;

        let now = self.clock.now();
        let token = self.find_acceptable(code, now).await?;

        // claim before deleting so the code cannot authorize a second run
        self.store
            .update(
                SUPERPASS_TOKENS,
                token.id,
                json!({
                    "used": true,
                    "status": TokenStatus::Verified,
                    "verifiedAt": now,
                }),
            )
            .await?;

        let catalog = token.action.catalog();
        let deleted = match (token.action.is_bulk(), token.target_ids.first()) {
            (true, _) => self.repository.delete_many(catalog, &token.target_ids).await,
            (false, Some(id)) => self.repository.delete(catalog, *id).await,
            (false, None) => Ok(()),
        };

        if let Err(e) = deleted {
            tracing::error!(
                "Superpass token {} verified but delete failed: {}; releasing claim",
                token.id,
                e
            );
            self.release_claim(token.id).await;
            return Err(e);
        }

        tracing::info!(
            "Superpass token {} consumed: {} removed {} categories",
            token.id,
            token.action,
            token.target_ids.len()
        );

        for catalog in Catalog::ALL {
            if let Err(e) = self.repository.refresh(catalog).await {
                tracing::error!("Failed to re-read {} catalog after delete: {}", catalog, e);
            }
        }

        Ok(VerifiedAction {
            token_id: token.id,
            action: token.action,
            deleted_ids: token.target_ids,
        })
    }

    /// Mark issued tokens past their window as expired
    pub async fn expire_overdue(&self) -> Result<usize> {
        let now = self.clock.now();
        let overdue: Vec<Uuid> = self
            .tokens()
            .await?
            .into_iter()
            .filter(|t| t.is_overdue(now))
            .map(|t| t.id)
            .collect();

        for id in &overdue {
            self.store
                .update(SUPERPASS_TOKENS, *id, json!({ "status": TokenStatus::Expired }))
                .await?;
        }

        if !overdue.is_empty() {
            tracing::info!("Expired {} overdue Superpass tokens", overdue.len());
        }
        Ok(overdue.len())
    }

    async fn tokens(&self) -> Result<Vec<AuthorizationToken>> {
        let documents = self.store.list(SUPERPASS_TOKENS).await?;
        Ok(documents
            .iter()
            .filter_map(|doc| match doc.decode::<AuthorizationToken>() {
                Ok(token) => Some(token),
                Err(e) => {
                    tracing::warn!("Skipping malformed Superpass token {}: {}", doc.id, e);
                    None
                }
            })
            .collect())
    }

    /// Token with this code that passes the check
    ///
    /// Codes are random, not unique; if several tokens share one the
    /// acceptable one wins, otherwise the newest explains the refusal.
    async fn find_acceptable(
        &self,
        code: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<AuthorizationToken> {
        let mut candidates: Vec<AuthorizationToken> = self
            .tokens()
            .await?
            .into_iter()
            .filter(|t| t.code == code)
            .collect();
        candidates.sort_by_key(|t| std::cmp::Reverse(t.created_at));

        let mut rejection = TokenRejection::Mismatch;
        for (i, token) in candidates.into_iter().enumerate() {
            match token.check(code, now) {
                Ok(()) => return Ok(token),
                Err(reason) if i == 0 => rejection = reason,
                Err(_) => {}
            }
        }

        Err(AppError::AuthorizationFailed(rejection.to_string()))
    }

    async fn release_claim(&self, id: Uuid) {
        let reset = json!({
            "used": false,
            "status": TokenStatus::Issued,
            "verifiedAt": null,
        });
        if let Err(e) = self.store.update(SUPERPASS_TOKENS, id, reset).await {
            tracing::error!("Failed to release Superpass token {}: {}", id, e);
        }
    }

    async fn check_targets_exist(&self, catalog: Catalog, ids: &[Uuid]) -> Result<()> {
        let known: HashSet<Uuid> = self
            .repository
            .list(catalog)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        match ids.iter().find(|id| !known.contains(id)) {
            Some(missing) => Err(AppError::Validation(format!(
                "{} category {} does not exist",
                catalog, missing
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::models::NewCategory;
    use crate::modules::document_store::MemoryDocumentStore;
    use crate::shared::clock::ManualClock;
    use crate::shared::test_helpers::RecordingMailer;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        service: SuperpassService,
        repository: Arc<CategoryRepository>,
        store: Arc<MemoryDocumentStore>,
        mailer: Arc<RecordingMailer>,
        clock: Arc<ManualClock>,
    }

    fn fixture_with(mailer: RecordingMailer) -> Fixture {
        let store = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
        ));
        let repository = Arc::new(CategoryRepository::new(store.clone(), clock.clone()));
        let mailer = Arc::new(mailer);
        let service = SuperpassService::new(
            store.clone(),
            repository.clone(),
            mailer.clone(),
            clock.clone(),
            SuperpassConfig::default(),
        );
        Fixture {
            service,
            repository,
            store,
            mailer,
            clock,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingMailer::default())
    }

    async fn create(repository: &CategoryRepository, catalog: Catalog, name: &str) -> Uuid {
        repository
            .create(
                catalog,
                NewCategory {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    async fn ids(repository: &CategoryRepository, catalog: Catalog) -> Vec<Uuid> {
        repository
            .list(catalog)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect()
    }

    #[tokio::test]
    async fn test_expired_bulk_token_deletes_nothing() {
        let f = fixture();
        let x = create(&f.repository, Catalog::Store, "X").await;
        let y = create(&f.repository, Catalog::Store, "Y").await;

        f.service
            .issue(SuperpassAction::Bulk, &[x, y])
            .await
            .unwrap();
        let code = f.mailer.last_code().await.unwrap();

        f.clock.advance(Duration::seconds(31));
        let err = f.service.verify(&code).await.unwrap_err();

        assert!(matches!(err, AppError::AuthorizationFailed(_)));
        assert_eq!(ids(&f.repository, Catalog::Store).await, vec![x, y]);
    }

    #[tokio::test]
    async fn test_single_token_deletes_once() {
        let f = fixture();
        let x = create(&f.repository, Catalog::Store, "X").await;
        let keep = create(&f.repository, Catalog::Store, "keep").await;

        let token = f.service.issue(SuperpassAction::Single, &[x]).await.unwrap();
        let code = f.mailer.last_code().await.unwrap();
        assert_eq!(token.code, code);
        assert_eq!(code.len(), 8);

        f.clock.advance(Duration::seconds(10));
        let verified = f.service.verify(&code).await.unwrap();
        assert_eq!(verified.deleted_ids, vec![x]);
        assert_eq!(ids(&f.repository, Catalog::Store).await, vec![keep]);
        assert_eq!(f.repository.snapshot(Catalog::Store).await.unwrap().len(), 1);

        let err = f.service.verify(&code).await.unwrap_err();
        assert!(matches!(err, AppError::AuthorizationFailed(_)));
    }

    #[tokio::test]
    async fn test_bulk_product_delete() {
        let f = fixture();
        let a = create(&f.repository, Catalog::Product, "a").await;
        let b = create(&f.repository, Catalog::Product, "b").await;
        let store_cat = create(&f.repository, Catalog::Store, "s").await;

        f.service
            .issue(SuperpassAction::BulkProduct, &[a, b])
            .await
            .unwrap();
        let code = f.mailer.last_code().await.unwrap();
        f.service.verify(&code).await.unwrap();

        assert!(ids(&f.repository, Catalog::Product).await.is_empty());
        assert_eq!(ids(&f.repository, Catalog::Store).await, vec![store_cat]);
    }

    #[tokio::test]
    async fn test_wrong_code_is_rejected() {
        let f = fixture();
        let x = create(&f.repository, Catalog::Store, "X").await;
        f.service.issue(SuperpassAction::Single, &[x]).await.unwrap();

        let err = f.service.verify("ZZZZZZZZ").await.unwrap_err();
        assert!(matches!(err, AppError::AuthorizationFailed(_)));
        assert_eq!(ids(&f.repository, Catalog::Store).await, vec![x]);
    }

    #[tokio::test]
    async fn test_issue_validates_cardinality_and_targets() {
        let f = fixture();
        let x = create(&f.repository, Catalog::Store, "X").await;
        let y = create(&f.repository, Catalog::Store, "Y").await;

        let err = f
            .service
            .issue(SuperpassAction::Single, &[x, y])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f.service.issue(SuperpassAction::Bulk, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // store ids are not product categories
        let err = f
            .service
            .issue(SuperpassAction::SingleProduct, &[x])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(f.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_token_valid() {
        let f = fixture_with(RecordingMailer::failing());
        let x = create(&f.repository, Catalog::Store, "X").await;

        let err = f
            .service
            .issue(SuperpassAction::Single, &[x])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Delivery(_)));

        let code = f.mailer.last_code().await.unwrap();
        f.service.verify(&code).await.unwrap();
        assert!(ids(&f.repository, Catalog::Store).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_releases_claim() {
        let f = fixture();
        let x = create(&f.repository, Catalog::Store, "X").await;
        f.service.issue(SuperpassAction::Single, &[x]).await.unwrap();
        let code = f.mailer.last_code().await.unwrap();

        f.store.fail_writes_for(x).await;
        let err = f.service.verify(&code).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));

        let tokens = f.service.tokens().await.unwrap();
        assert!(!tokens[0].used);
        assert_eq!(tokens[0].status, TokenStatus::Issued);
    }

    #[tokio::test]
    async fn test_sweep_marks_overdue_tokens_expired() {
        let f = fixture();
        let x = create(&f.repository, Catalog::Store, "X").await;
        f.service.issue(SuperpassAction::Single, &[x]).await.unwrap();

        assert_eq!(f.service.expire_overdue().await.unwrap(), 0);
        f.clock.advance(Duration::seconds(30));
        assert_eq!(f.service.expire_overdue().await.unwrap(), 1);
        assert_eq!(f.service.expire_overdue().await.unwrap(), 0);

        let tokens = f.service.tokens().await.unwrap();
        assert_eq!(tokens[0].status, TokenStatus::Expired);
    }

    #[tokio::test]
    async fn test_payload_describes_action() {
        let f = fixture();
        let x = create(&f.repository, Catalog::Store, "X").await;
        let y = create(&f.repository, Catalog::Store, "Y").await;
        let token = f.service.issue(SuperpassAction::Bulk, &[x, y]).await.unwrap();

        let sent = f.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        let (recipient, payload) = &sent[0];
        assert_eq!(recipient, "admin@localhost");
        assert_eq!(payload.item_count, 2);
        assert_eq!(payload.expires_at, token.expires_at);
        assert_eq!(payload.ttl_secs, 30);
        assert!(payload.action_description.contains("2 store categories"));
    }
}
