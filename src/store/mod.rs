pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{GoalCard, GoalType, NewGoalCard, SkillLevel};
use crate::error::{MatchEngineError, Result};

pub use sqlite::SqliteCardStore;

/// Largest page a listing may request
pub const MAX_PER_PAGE: u32 = 50;

/// Start of an age window ending at `now`. Windows reaching past the
/// representable date range are rejected instead of wrapping or panicking.
pub fn window_start(now: DateTime<Utc>, max_age_days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(max_age_days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            MatchEngineError::Validation(format!("age window of {max_age_days} days is out of range"))
        })
}

/// Trait for goal card record stores
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Persist a new card, assigning its id and `created_at`
    async fn insert(&self, owner_id: &str, card: &NewGoalCard, now: DateTime<Utc>) -> Result<GoalCard>;

    /// Get card by id
    async fn get(&self, id: Uuid) -> Result<Option<GoalCard>>;

    /// Overwrite the editable fields of an existing card. Returns false if
    /// the card no longer exists.
    async fn update(&self, card: &GoalCard) -> Result<bool>;

    /// Delete card by id. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Up to `limit` cards created within the last `max_age_days` before
    /// `now`, newest first. This is the candidate pool for matching.
    async fn fetch_recent_cards(
        &self,
        now: DateTime<Utc>,
        max_age_days: i64,
        limit: usize,
    ) -> Result<Vec<GoalCard>>;

    /// Filtered, paginated listing, newest first
    async fn list(
        &self,
        filter: &CardFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<GoalCard>>;

    /// Reset `created_at` to `now`. Returns false if the card is gone.
    async fn touch(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Store a relist token
    async fn save_relist_token(&self, token: &RelistToken) -> Result<()>;

    /// Look up a relist token
    async fn get_relist_token(&self, token: &str) -> Result<Option<RelistToken>>;

    /// Remove a relist token. Returns false if it did not exist.
    async fn delete_relist_token(&self, token: &str) -> Result<bool>;

    /// Get store statistics
    async fn stats(&self, now: DateTime<Utc>, max_age_days: i64) -> Result<StoreStats>;
}

/// Listing filters. `None` fields do not constrain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardFilter {
    #[serde(default)]
    pub goal_type: Option<GoalType>,

    #[serde(default)]
    pub skill_level: Option<SkillLevel>,

    /// Card must carry this tag
    #[serde(default)]
    pub tech_tag: Option<String>,

    #[serde(default)]
    pub owner_id: Option<String>,

    /// Only cards created within this many days
    #[serde(default)]
    pub max_age_days: Option<i64>,
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: 10 }
    }
}

impl PageRequest {
    /// Clamp to page >= 1 and 1..=MAX_PER_PAGE items
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Single-use token that refreshes a card's listing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelistToken {
    pub token: String,
    pub card_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl RelistToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Store statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_cards: u64,
    /// Cards still inside the candidate window
    pub active_cards: u64,
    pub relist_tokens: u64,
    pub oldest_card: Option<DateTime<Utc>>,
    pub newest_card: Option<DateTime<Utc>>,
}
