use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::{GoalCard, MatchResponse, NewGoalCard};
use crate::error::{MatchEngineError, Result};
use crate::ranking::{self, Ranker, ScoreBreakdown, WeightedRanker};
use crate::store::{CardFilter, CardStore, Page, PageRequest, RelistToken, SqliteCardStore, StoreStats};

/// Main matchmaking orchestrator: candidate retrieval, ranking and the
/// card workflows around them
pub struct MatchEngine {
    store: Arc<dyn CardStore>,
    ranker: Arc<dyn Ranker>,
    options: MatchOptions,
}

/// Matching options/configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Candidates must score strictly above this
    pub min_score: u32,
    /// Matches returned per request
    pub max_results: usize,
    /// Candidate pool age window
    pub max_age_days: i64,
    /// Candidate pool size cap
    pub pool_limit: usize,
    /// Lifetime of an issued relist token
    pub relist_token_ttl_days: i64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            min_score: ranking::weighted::DEFAULT_MIN_SCORE,
            max_results: ranking::weighted::DEFAULT_MAX_RESULTS,
            max_age_days: 14,
            pool_limit: 100,
            relist_token_ttl_days: 7,
        }
    }
}

/// A freshly stored card with the matches found for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedCard {
    pub card: GoalCard,
    pub matches: MatchResponse,
}

impl MatchEngine {
    /// Create new engine with a SQLite store and default options
    pub async fn new(db_path: impl AsRef<str>) -> Result<Self> {
        let store = Arc::new(SqliteCardStore::new(db_path.as_ref()).await?);
        Ok(Self::with_store(store, MatchOptions::default()))
    }

    /// Create engine from loaded configuration
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let store = Arc::new(SqliteCardStore::new(&config.db_path).await?);
        Ok(Self::with_store(store, config.match_options.clone()))
    }

    /// Create engine over any store; the ranker follows `options`
    pub fn with_store(store: Arc<dyn CardStore>, options: MatchOptions) -> Self {
        let ranker = Arc::new(WeightedRanker::with_limits(options.min_score, options.max_results));
        tracing::info!(
            "Match engine ready (min_score > {}, top {}, pool {} cards / {} days)",
            options.min_score,
            options.max_results,
            options.pool_limit,
            options.max_age_days
        );
        Self { store, ranker, options }
    }

    /// Swap the ranker
    pub fn with_ranker(mut self, ranker: Arc<dyn Ranker>) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Rank recent cards against `new_card`. Never fails: a retrieval error
    /// yields an empty, degraded response.
    pub async fn find_matches(&self, new_card: &NewGoalCard) -> MatchResponse {
        self.find_matches_at(new_card, Utc::now()).await
    }

    /// [`find_matches`](Self::find_matches) with an explicit "now"
    pub async fn find_matches_at(&self, new_card: &NewGoalCard, now: DateTime<Utc>) -> MatchResponse {
        let start = Instant::now();

        let pool = match self
            .store
            .fetch_recent_cards(now, self.options.max_age_days, self.options.pool_limit)
            .await
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!("Error fetching potential matches: {}", e);
                return MatchResponse::empty(self.ranker.name(), true, elapsed_ms(start));
            }
        };

        let matches = self.ranker.rank(new_card, &pool);

        let response = MatchResponse {
            matches,
            candidate_pool_size: pool.len(),
            degraded: false,
            latency_ms: elapsed_ms(start),
            ranking_method: self.ranker.name().to_string(),
        };
        tracing::debug!("{}", response.display());

        response
    }

    /// Validate a card without storing it and match it against the recent pool
    pub async fn preview_matches(&self, card: NewGoalCard) -> Result<MatchResponse> {
        let card = card.normalize()?;
        Ok(self.find_matches(&card).await)
    }

    /// Validate and store a new card, then match it against the recent pool
    pub async fn submit_card(&self, owner_id: &str, card: NewGoalCard) -> Result<SubmittedCard> {
        self.submit_card_at(owner_id, card, Utc::now()).await
    }

    pub async fn submit_card_at(
        &self,
        owner_id: &str,
        card: NewGoalCard,
        now: DateTime<Utc>,
    ) -> Result<SubmittedCard> {
        let card = card.normalize()?;
        let stored = self.store.insert(owner_id, &card, now).await?;
        tracing::info!("Posted card {} for {}", stored.id, owner_id);

        let matches = self.find_matches_at(&card, now).await;

        Ok(SubmittedCard { card: stored, matches })
    }

    /// Get card by id
    pub async fn get_card(&self, id: Uuid) -> Result<GoalCard> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| MatchEngineError::NotFound(id.to_string()))
    }

    /// Filtered listing, newest first
    pub async fn list_cards(&self, filter: &CardFilter, page: &PageRequest) -> Result<Page<GoalCard>> {
        self.store.list(filter, page, Utc::now()).await
    }

    /// Replace the editable fields of a card the caller owns
    pub async fn update_card(&self, id: Uuid, owner_id: &str, card: NewGoalCard) -> Result<GoalCard> {
        let card = card.normalize()?;
        let mut stored = self.owned_card(id, owner_id).await?;
        stored.apply_edit(card);

        if !self.store.update(&stored).await? {
            return Err(MatchEngineError::NotFound(id.to_string()));
        }

        tracing::info!("Updated card {}", id);
        Ok(stored)
    }

    /// Delete a card the caller owns
    pub async fn delete_card(&self, id: Uuid, owner_id: &str) -> Result<()> {
        self.owned_card(id, owner_id).await?;

        if !self.store.delete(id).await? {
            return Err(MatchEngineError::NotFound(id.to_string()));
        }

        tracing::info!("Deleted card {}", id);
        Ok(())
    }

    /// Issue a single-use relist token for a card the caller owns
    pub async fn issue_relist_token(&self, id: Uuid, owner_id: &str) -> Result<RelistToken> {
        self.owned_card(id, owner_id).await?;

        let ttl_days = self.options.relist_token_ttl_days;
        let expires_at = Duration::try_days(ttl_days)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                MatchEngineError::Config(format!("relist token lifetime of {ttl_days} days is out of range"))
            })?;

        let token = RelistToken {
            token: Uuid::new_v4().simple().to_string(),
            card_id: id,
            expires_at,
        };
        self.store.save_relist_token(&token).await?;

        tracing::debug!("Issued relist token for card {}", id);
        Ok(token)
    }

    /// Redeem a relist token, moving its card back to the top of the pool.
    /// Returns the relisted card id.
    pub async fn relist(&self, token: &str) -> Result<Uuid> {
        self.relist_at(token, Utc::now()).await
    }

    pub async fn relist_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid> {
        let Some(stored) = self.store.get_relist_token(token).await? else {
            tracing::warn!("Relist attempt with invalid or non-existent token");
            return Err(MatchEngineError::InvalidRelistToken);
        };

        if stored.is_expired(now) {
            tracing::warn!("Relist attempt with expired token for card {}", stored.card_id);
            self.store.delete_relist_token(token).await?;
            return Err(MatchEngineError::ExpiredRelistToken);
        }

        if !self.store.touch(stored.card_id, now).await? {
            return Err(MatchEngineError::NotFound(stored.card_id.to_string()));
        }

        if let Err(e) = self.store.delete_relist_token(token).await {
            tracing::warn!("Failed to delete used relist token: {}", e);
        }

        tracing::info!("Relisted card {}", stored.card_id);
        Ok(stored.card_id)
    }

    /// Score one stored card against another, signal by signal
    pub async fn explain(&self, card_id: Uuid, candidate_id: Uuid) -> Result<ScoreBreakdown> {
        let card = self.get_card(card_id).await?;
        let candidate = self.get_card(candidate_id).await?;
        Ok(ranking::breakdown(&NewGoalCard::from(&card), &candidate))
    }

    /// Get store statistics
    pub async fn stats(&self) -> Result<StoreStats> {
        self.store.stats(Utc::now(), self.options.max_age_days).await
    }

    async fn owned_card(&self, id: Uuid, owner_id: &str) -> Result<GoalCard> {
        let card = self.get_card(id).await?;
        if card.owner_id != owner_id {
            return Err(MatchEngineError::Forbidden(format!("card {} belongs to another user", id)));
        }
        Ok(card)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContactMethod, GoalType, ScoredCard, SkillLevel, Vibe};
    use async_trait::async_trait;

    fn card(handle: &str, skill: SkillLevel, tags: &[&str]) -> NewGoalCard {
        NewGoalCard {
            goal_type: GoalType::Build,
            skill_level: skill,
            vibe: Vibe::Focused,
            tech_tags: tags.iter().map(|t| t.to_string()).collect(),
            description: format!("{} wants to build", handle),
            contact_method: ContactMethod::Discord,
            contact_handle: handle.to_string(),
            email: None,
            timezone: None,
            availability: None,
        }
    }

    /// Store whose every call fails, standing in for an unreachable backend
    struct UnreachableStore;

    #[async_trait]
    impl CardStore for UnreachableStore {
        async fn insert(&self, _: &str, _: &NewGoalCard, _: DateTime<Utc>) -> Result<GoalCard> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn get(&self, _: Uuid) -> Result<Option<GoalCard>> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn update(&self, _: &GoalCard) -> Result<bool> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn delete(&self, _: Uuid) -> Result<bool> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn fetch_recent_cards(&self, _: DateTime<Utc>, _: i64, _: usize) -> Result<Vec<GoalCard>> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn list(&self, _: &CardFilter, _: &PageRequest, _: DateTime<Utc>) -> Result<Page<GoalCard>> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn touch(&self, _: Uuid, _: DateTime<Utc>) -> Result<bool> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn save_relist_token(&self, _: &RelistToken) -> Result<()> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn get_relist_token(&self, _: &str) -> Result<Option<RelistToken>> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn delete_relist_token(&self, _: &str) -> Result<bool> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
        async fn stats(&self, _: DateTime<Utc>, _: i64) -> Result<StoreStats> {
            Err(MatchEngineError::Store("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_engine_creation() {
        let result = MatchEngine::new(":memory:").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_to_empty() {
        let engine = MatchEngine::with_store(Arc::new(UnreachableStore), MatchOptions::default());

        let response = engine.find_matches(&card("a", SkillLevel::Beginner, &["rust"])).await;
        assert!(response.is_empty());
        assert!(response.degraded);
        assert_eq!(response.candidate_pool_size, 0);
    }

    #[tokio::test]
    async fn test_out_of_range_pool_window_degrades() {
        let store = Arc::new(SqliteCardStore::new(":memory:").await.unwrap());
        let options = MatchOptions {
            max_age_days: 100_000_000,
            ..MatchOptions::default()
        };
        let engine = MatchEngine::with_store(store, options);

        let response = engine.find_matches(&card("a", SkillLevel::Beginner, &["rust"])).await;
        assert!(response.is_empty());
        assert!(response.degraded);

        assert!(matches!(engine.stats().await, Err(MatchEngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_relist_ttl_is_error() {
        let store = Arc::new(SqliteCardStore::new(":memory:").await.unwrap());
        let options = MatchOptions {
            relist_token_ttl_days: i64::MAX,
            ..MatchOptions::default()
        };
        let engine = MatchEngine::with_store(store, options);

        let posted = engine
            .submit_card("owner", card("crab", SkillLevel::Beginner, &["rust"]))
            .await
            .unwrap()
            .card;

        assert!(matches!(
            engine.issue_relist_token(posted.id, "owner").await,
            Err(MatchEngineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_finds_others_not_self() {
        let engine = MatchEngine::new(":memory:").await.unwrap();

        engine
            .submit_card("u1", card("crab", SkillLevel::Beginner, &["rust"]))
            .await
            .unwrap();
        engine
            .submit_card("u2", card("pythonista", SkillLevel::Advanced, &["python"]))
            .await
            .unwrap();

        let submitted = engine
            .submit_card("u3", card("ferris", SkillLevel::Intermediate, &["Rust", "api"]))
            .await
            .unwrap();

        assert_eq!(submitted.card.tech_tags, vec!["rust", "api"]);
        assert_eq!(submitted.matches.candidate_pool_size, 3);

        let handles: Vec<&str> = submitted
            .matches
            .matches
            .iter()
            .map(|m: &ScoredCard| m.card.contact_handle.as_str())
            .collect();
        // crab: 8 + 10 + 5 + 10 + 1 = 34; pythonista: 8 + 10 + 5 + 1 = 24
        assert_eq!(handles, vec!["crab", "pythonista"]);
        assert_eq!(submitted.matches.best_score(), Some(34));
    }

    #[tokio::test]
    async fn test_preview_normalizes_like_submit() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        engine
            .submit_card("u1", card("crab", SkillLevel::Beginner, &["rust"]))
            .await
            .unwrap();

        let preview = engine
            .preview_matches(card("ferris", SkillLevel::Intermediate, &[" Rust", "API "]))
            .await
            .unwrap();
        assert_eq!(preview.best_score(), Some(34));

        // Previewing does not store the card
        assert_eq!(engine.stats().await.unwrap().total_cards, 1);

        let invalid = engine.preview_matches(card("ferris", SkillLevel::Intermediate, &[])).await;
        assert!(matches!(invalid, Err(MatchEngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_card() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        let result = engine.submit_card("u1", card("crab", SkillLevel::Beginner, &[])).await;
        assert!(matches!(result, Err(MatchEngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_stale_cards_are_not_candidates() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        let now = Utc::now();

        engine
            .submit_card_at("u1", card("old", SkillLevel::Intermediate, &["rust"]), now - Duration::days(15))
            .await
            .unwrap();

        let response = engine
            .find_matches_at(&card("new", SkillLevel::Intermediate, &["rust"]), now)
            .await;
        assert!(response.is_empty());
        assert!(!response.degraded);
    }

    #[tokio::test]
    async fn test_update_and_delete_require_owner() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        let posted = engine
            .submit_card("owner", card("crab", SkillLevel::Beginner, &["rust"]))
            .await
            .unwrap()
            .card;

        let edit = card("crab", SkillLevel::Intermediate, &["rust", "wasm"]);
        let denied = engine.update_card(posted.id, "intruder", edit.clone()).await;
        assert!(matches!(denied, Err(MatchEngineError::Forbidden(_))));

        let updated = engine.update_card(posted.id, "owner", edit).await.unwrap();
        assert_eq!(updated.skill_level, SkillLevel::Intermediate);
        assert_eq!(updated.created_at.timestamp_micros(), posted.created_at.timestamp_micros());

        assert!(matches!(
            engine.delete_card(posted.id, "intruder").await,
            Err(MatchEngineError::Forbidden(_))
        ));
        engine.delete_card(posted.id, "owner").await.unwrap();
        assert!(matches!(engine.get_card(posted.id).await, Err(MatchEngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_relist_flow() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        let now = Utc::now();
        let posted = engine
            .submit_card_at("owner", card("crab", SkillLevel::Beginner, &["rust"]), now - Duration::days(20))
            .await
            .unwrap()
            .card;

        let token = engine.issue_relist_token(posted.id, "owner").await.unwrap();
        assert_eq!(engine.relist_at(&token.token, now).await.unwrap(), posted.id);

        let relisted = engine.get_card(posted.id).await.unwrap();
        assert_eq!(relisted.created_at.timestamp_micros(), now.timestamp_micros());

        // Tokens are single-use
        assert!(matches!(
            engine.relist_at(&token.token, now).await,
            Err(MatchEngineError::InvalidRelistToken)
        ));
    }

    #[tokio::test]
    async fn test_expired_relist_token_is_consumed() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        let posted = engine
            .submit_card("owner", card("crab", SkillLevel::Beginner, &["rust"]))
            .await
            .unwrap()
            .card;

        let token = engine.issue_relist_token(posted.id, "owner").await.unwrap();
        let later = token.expires_at + Duration::seconds(1);

        assert!(matches!(
            engine.relist_at(&token.token, later).await,
            Err(MatchEngineError::ExpiredRelistToken)
        ));
        assert!(matches!(
            engine.relist_at(&token.token, later).await,
            Err(MatchEngineError::InvalidRelistToken)
        ));
    }

    #[tokio::test]
    async fn test_relist_token_requires_owner() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        let posted = engine
            .submit_card("owner", card("crab", SkillLevel::Beginner, &["rust"]))
            .await
            .unwrap()
            .card;

        assert!(matches!(
            engine.issue_relist_token(posted.id, "someone").await,
            Err(MatchEngineError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_explain() {
        let engine = MatchEngine::new(":memory:").await.unwrap();
        let a = engine
            .submit_card("u1", card("ferris", SkillLevel::Intermediate, &["rust", "api"]))
            .await
            .unwrap()
            .card;
        let b = engine
            .submit_card("u2", card("crab", SkillLevel::Beginner, &["rust"]))
            .await
            .unwrap()
            .card;

        let breakdown = engine.explain(a.id, b.id).await.unwrap();
        assert_eq!(breakdown.skill, 8);
        assert_eq!(breakdown.total(), 34);
    }
}
