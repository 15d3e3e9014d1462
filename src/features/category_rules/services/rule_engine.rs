use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{unique_ids, Catalog, Category};
use crate::features::categories::services::CategoryRepository;
use crate::features::category_rules::models::{
    CategoryRule, NewRule, RuleMergeEntry, RulePatch, RuleType,
};
use crate::modules::document_store::{encode, DocumentStore, StoreError, CATEGORY_RULES};
use crate::shared::clock::Clock;
use crate::shared::constants::{MAX_NAME_LENGTH, RELATED_RULE_NAME_SUFFIX};

/// Minimum number of categories a rule groups
const MIN_RULE_CATEGORIES: usize = 2;

/// Decision taken for a candidate grouping
#[derive(Debug, Clone, PartialEq)]
pub enum MergePlan {
    /// No rule overlaps; create one over these ids
    Create { category_ids: Vec<Uuid> },
    /// Fold into `target` (already updated) and delete `absorbed`
    Merge {
        target: CategoryRule,
        absorbed: Vec<Uuid>,
    },
}

/// What the inline path did with a category edit
#[derive(Debug, Clone, PartialEq)]
pub enum RuleMergeOutcome {
    Created(CategoryRule),
    Merged {
        rule: CategoryRule,
        absorbed: Vec<Uuid>,
    },
}

/// Decide between merge and create for `candidate`
///
/// Every overlapping rule is folded into the oldest one so the rule set never
/// ends up with two groupings sharing a category. Ids are unioned, the chosen
/// type replaces the old one and the previous state goes into `mergeHistory`.
pub fn plan_merge(
    rules: &[CategoryRule],
    candidate: &[Uuid],
    rule_type: RuleType,
    now: DateTime<Utc>,
) -> MergePlan {
    let mut overlapping: Vec<&CategoryRule> =
        rules.iter().filter(|r| r.overlaps(candidate)).collect();

    if overlapping.is_empty() {
        return MergePlan::Create {
            category_ids: unique_ids(candidate.iter().copied()),
        };
    }

    overlapping.sort_by_key(|r| (r.created_at, r.id));
    let (oldest, rest) = (overlapping[0], &overlapping[1..]);

    let category_ids = unique_ids(
        oldest
            .category_ids
            .iter()
            .chain(rest.iter().flat_map(|r| r.category_ids.iter()))
            .chain(candidate.iter())
            .copied(),
    );
    let absorbed: Vec<Uuid> = rest.iter().map(|r| r.id).collect();

    let mut target = oldest.clone();
    target.merge_history.push(RuleMergeEntry {
        previous_category_ids: oldest.category_ids.clone(),
        previous_rule_type: oldest.rule_type,
        incoming_category_ids: candidate.to_vec(),
        absorbed_rule_ids: absorbed.clone(),
        merged_at: now,
    });
    target.category_ids = category_ids;
    target.rule_type = rule_type;
    target.updated_at = now;

    MergePlan::Merge { target, absorbed }
}

/// Category rule set plus the merge-vs-create path used from category edits
pub struct RuleEngine {
    store: Arc<dyn DocumentStore>,
    repository: Arc<CategoryRepository>,
    clock: Arc<dyn Clock>,
}

impl RuleEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        repository: Arc<CategoryRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            repository,
            clock,
        }
    }

    /// All rules, oldest first
    pub async fn list(&self) -> Result<Vec<CategoryRule>> {
        let documents = self.store.list(CATEGORY_RULES).await?;
        let mut rules: Vec<CategoryRule> = documents
            .iter()
            .filter_map(|doc| match doc.decode::<CategoryRule>() {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!("Skipping malformed category rule {}: {}", doc.id, e);
                    None
                }
            })
            .collect();
        rules.sort_by_key(|r| (r.created_at, r.id));
        Ok(rules)
    }

    pub async fn get(&self, id: Uuid) -> Result<CategoryRule> {
        let doc = self
            .store
            .get(CATEGORY_RULES, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category rule {} not found", id)))?;
        Ok(doc.decode()?)
    }

    pub async fn create_rule(&self, rule: NewRule) -> Result<CategoryRule> {
        let name = normalize_name(&rule.name)?;
        let category_ids = self.validate_category_ids(&rule.category_ids).await?;

        let created = self
            .insert(name, rule.description.trim().to_string(), category_ids, rule.rule_type)
            .await?;
        tracing::info!(
            "Created category rule: id={}, type={}, categories={}",
            created.id,
            created.rule_type,
            created.category_ids.len()
        );
        Ok(created)
    }

    pub async fn edit_rule(&self, id: Uuid, mut patch: RulePatch) -> Result<CategoryRule> {
        // existence first so a bad id is reported as such
        self.get(id).await?;

        if let Some(name) = patch.name.take() {
            patch.name = Some(normalize_name(&name)?);
        }
        if let Some(description) = patch.description.take() {
            patch.description = Some(description.trim().to_string());
        }
        if let Some(ids) = patch.category_ids.take() {
            patch.category_ids = Some(self.validate_category_ids(&ids).await?);
        }
        patch.merge_history = None;

        self.write_patch(id, &patch).await?;
        tracing::info!("Updated category rule {}", id);
        self.get(id).await
    }

    /// Unconditional; categories referenced by the rule are untouched
    pub async fn delete_rule(&self, id: Uuid) -> Result<()> {
        self.get(id).await?;
        self.store.delete(CATEGORY_RULES, id).await?;
        tracing::info!("Deleted category rule {}", id);
        Ok(())
    }

    /// Merge `{category} ∪ partners` into the overlapping rule or create one
    pub async fn merge_for_category(
        &self,
        category: &Category,
        rule_type: RuleType,
        partner_ids: &[Uuid],
    ) -> Result<RuleMergeOutcome> {
        let candidate = self.validate_link(category.id, partner_ids).await?;

        let rules = self.list().await?;
        match plan_merge(&rules, &candidate, rule_type, self.clock.now()) {
            MergePlan::Create { category_ids } => {
                let name = related_rule_name(&category.name);
                let description = format!("Grouping created while editing {}", category.name);
                let rule = self.insert(name, description, category_ids, rule_type).await?;
                tracing::info!(
                    "Created rule {} from category {} edit ({} categories)",
                    rule.id,
                    category.id,
                    rule.category_ids.len()
                );
                Ok(RuleMergeOutcome::Created(rule))
            }
            MergePlan::Merge { target, absorbed } => {
                let patch = RulePatch {
                    category_ids: Some(target.category_ids.clone()),
                    rule_type: Some(target.rule_type),
                    merge_history: Some(target.merge_history.clone()),
                    ..Default::default()
                };
                self.write_patch(target.id, &patch).await?;

                if !absorbed.is_empty() {
                    self.store.delete_many(CATEGORY_RULES, &absorbed).await?;
                }

                tracing::info!(
                    "Merged category {} into rule {} ({} categories, {} rules absorbed)",
                    category.id,
                    target.id,
                    target.category_ids.len(),
                    absorbed.len()
                );
                let rule = self.get(target.id).await?;
                Ok(RuleMergeOutcome::Merged { rule, absorbed })
            }
        }
    }

    /// Candidate set for a category edit, checked without writing anything
    pub async fn validate_link(&self, category_id: Uuid, partner_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let candidate: Vec<Uuid> = std::iter::once(category_id)
            .chain(partner_ids.iter().copied())
            .collect();
        self.validate_category_ids(&candidate).await
    }

    async fn insert(
        &self,
        name: String,
        description: String,
        category_ids: Vec<Uuid>,
        rule_type: RuleType,
    ) -> Result<CategoryRule> {
        let now = self.clock.now();
        let mut rule = CategoryRule {
            id: Uuid::nil(),
            name,
            description,
            category_ids,
            rule_type,
            merge_history: vec![],
            created_at: now,
            updated_at: now,
        };
        rule.id = self.store.create(CATEGORY_RULES, encode(&rule)?).await?;
        Ok(rule)
    }

    async fn write_patch(&self, id: Uuid, patch: &RulePatch) -> Result<()> {
        let mut fields = encode(patch)?;
        if let Value::Object(map) = &mut fields {
            map.insert("updatedAt".to_string(), json!(self.clock.now()));
        }
        self.store
            .update(CATEGORY_RULES, id, fields)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => {
                    AppError::NotFound(format!("Category rule {} not found", id))
                }
                other => AppError::Persistence(other),
            })
    }

    /// Deduplicate and require at least two existing store categories
    async fn validate_category_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let ids = unique_ids(ids.iter().copied());
        if ids.len() < MIN_RULE_CATEGORIES {
            return Err(AppError::Validation(format!(
                "A category rule needs at least {} distinct categories",
                MIN_RULE_CATEGORIES
            )));
        }

        let known: HashSet<Uuid> = self
            .repository
            .list(Catalog::Store)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
            return Err(AppError::Validation(format!(
                "Store category {} does not exist",
                missing
            )));
        }

        Ok(ids)
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Rule name must not be empty".to_string(),
        ));
    }
    if name.chars().count() as u64 > MAX_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Rule name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Generated name for a rule created from a category edit; the category
/// part is cut so the whole name fits `MAX_NAME_LENGTH`
fn related_rule_name(category_name: &str) -> String {
    let budget = (MAX_NAME_LENGTH as usize)
        .saturating_sub(RELATED_RULE_NAME_SUFFIX.chars().count() + 1);
    let head: String = category_name.chars().take(budget).collect();
    format!("{} {}", head.trim_end(), RELATED_RULE_NAME_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::models::NewCategory;
    use crate::modules::document_store::MemoryDocumentStore;
    use crate::shared::clock::ManualClock;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        engine: RuleEngine,
        repository: Arc<CategoryRepository>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let repository = Arc::new(CategoryRepository::new(store.clone(), clock.clone()));
        let engine = RuleEngine::new(store, repository.clone(), clock.clone());
        Fixture {
            engine,
            repository,
            clock,
        }
    }

    async fn store_category(repository: &CategoryRepository, name: &str) -> Category {
        let id = repository
            .create(
                Catalog::Store,
                NewCategory {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        repository.get(Catalog::Store, id).await.unwrap()
    }

    fn new_rule(name: &str, ids: Vec<Uuid>) -> NewRule {
        NewRule {
            name: name.to_string(),
            description: String::new(),
            category_ids: ids,
            rule_type: RuleType::ParentChild,
        }
    }

    #[tokio::test]
    async fn test_category_edit_without_prior_rule_creates_one() {
        let f = fixture();
        let a = store_category(&f.repository, "A").await;
        let b = store_category(&f.repository, "B").await;

        let outcome = f
            .engine
            .merge_for_category(&a, RuleType::CrossDisplay, &[b.id])
            .await
            .unwrap();

        let RuleMergeOutcome::Created(rule) = outcome else {
            panic!("expected a new rule");
        };
        assert_eq!(rule.category_ids, vec![a.id, b.id]);
        assert_eq!(rule.rule_type, RuleType::CrossDisplay);
        assert_eq!(rule.name, format!("A {}", RELATED_RULE_NAME_SUFFIX));
        assert_eq!(f.engine.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rule_name_length_is_limited() {
        let f = fixture();
        let a = store_category(&f.repository, "A").await;
        let b = store_category(&f.repository, "B").await;

        let long = "r".repeat(MAX_NAME_LENGTH as usize + 1);
        let err = f
            .engine
            .create_rule(new_rule(&long, vec![a.id, b.id]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.engine.list().await.unwrap().is_empty());

        // a category name at the limit still yields a storable rule name
        let wide = store_category(&f.repository, &"w".repeat(MAX_NAME_LENGTH as usize)).await;
        let outcome = f
            .engine
            .merge_for_category(&wide, RuleType::CrossDisplay, &[a.id])
            .await
            .unwrap();
        let RuleMergeOutcome::Created(rule) = outcome else {
            panic!("expected a new rule");
        };
        assert_eq!(rule.name.chars().count() as u64, MAX_NAME_LENGTH);
        assert!(rule.name.ends_with(RELATED_RULE_NAME_SUFFIX));
    }

    #[tokio::test]
    async fn test_overlapping_edit_merges_into_one_rule() {
        let f = fixture();
        let a = store_category(&f.repository, "A").await;
        let b = store_category(&f.repository, "B").await;
        let c = store_category(&f.repository, "C").await;

        let existing = f
            .engine
            .create_rule(new_rule("AB", vec![a.id, b.id]))
            .await
            .unwrap();
        f.clock.advance(Duration::seconds(10));

        let outcome = f
            .engine
            .merge_for_category(&a, RuleType::CrossDisplay, &[c.id])
            .await
            .unwrap();

        let rules = f.engine.list().await.unwrap();
        assert_eq!(rules.len(), 1);
        let merged = &rules[0];
        assert_eq!(merged.id, existing.id);
        assert_eq!(merged.category_ids, vec![a.id, b.id, c.id]);
        assert_eq!(merged.rule_type, RuleType::CrossDisplay);
        assert_eq!(merged.merge_history.len(), 1);
        assert_eq!(merged.merge_history[0].previous_category_ids, vec![a.id, b.id]);
        assert_eq!(merged.merge_history[0].previous_rule_type, RuleType::ParentChild);
        assert!(matches!(outcome, RuleMergeOutcome::Merged { .. }));
    }

    #[tokio::test]
    async fn test_several_overlapping_rules_fold_into_oldest() {
        let f = fixture();
        let a = store_category(&f.repository, "A").await;
        let b = store_category(&f.repository, "B").await;
        let c = store_category(&f.repository, "C").await;
        let d = store_category(&f.repository, "D").await;

        let first = f
            .engine
            .create_rule(new_rule("AB", vec![a.id, b.id]))
            .await
            .unwrap();
        f.clock.advance(Duration::seconds(1));
        let second = f
            .engine
            .create_rule(new_rule("CD", vec![c.id, d.id]))
            .await
            .unwrap();

        let outcome = f
            .engine
            .merge_for_category(&b, RuleType::ParentChild, &[c.id])
            .await
            .unwrap();

        let rules = f.engine.list().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, first.id);
        let ids: HashSet<Uuid> = rules[0].category_ids.iter().copied().collect();
        assert_eq!(ids, HashSet::from([a.id, b.id, c.id, d.id]));
        assert_eq!(
            outcome,
            RuleMergeOutcome::Merged {
                rule: rules[0].clone(),
                absorbed: vec![second.id]
            }
        );
    }

    #[tokio::test]
    async fn test_create_rule_requires_two_known_categories() {
        let f = fixture();
        let a = store_category(&f.repository, "A").await;

        let err = f
            .engine
            .create_rule(new_rule("solo", vec![a.id, a.id]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f
            .engine
            .create_rule(new_rule("ghost", vec![a.id, Uuid::now_v7()]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let b = store_category(&f.repository, "B").await;
        let err = f
            .engine
            .create_rule(new_rule("  ", vec![a.id, b.id]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(f.engine.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_and_delete_rule() {
        let f = fixture();
        let a = store_category(&f.repository, "A").await;
        let b = store_category(&f.repository, "B").await;
        let rule = f
            .engine
            .create_rule(new_rule("AB", vec![a.id, b.id]))
            .await
            .unwrap();

        let edited = f
            .engine
            .edit_rule(
                rule.id,
                RulePatch {
                    name: Some(" Renamed ".to_string()),
                    rule_type: Some(RuleType::CrossDisplay),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.name, "Renamed");
        assert_eq!(edited.rule_type, RuleType::CrossDisplay);
        assert_eq!(edited.category_ids, vec![a.id, b.id]);

        let err = f
            .engine
            .edit_rule(
                rule.id,
                RulePatch {
                    category_ids: Some(vec![a.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        f.engine.delete_rule(rule.id).await.unwrap();
        assert!(f.engine.list().await.unwrap().is_empty());
        // categories are not touched by rule deletion
        assert_eq!(f.repository.list(Catalog::Store).await.unwrap().len(), 2);
        assert!(matches!(
            f.engine.delete_rule(rule.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_plan_merge_without_overlap_creates() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let plan = plan_merge(&[], &[a, b, a], RuleType::ParentChild, Utc::now());
        assert_eq!(
            plan,
            MergePlan::Create {
                category_ids: vec![a, b]
            }
        );
    }
}
