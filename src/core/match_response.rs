use serde::{Deserialize, Serialize};
use crate::core::GoalCard;

/// A candidate decorated with its transient match score.
///
/// The score is never written back to the card; it only lives for the
/// duration of one matching request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCard {
    #[serde(flatten)]
    pub card: GoalCard,

    pub match_score: u32,
}

impl ScoredCard {
    pub fn new(card: GoalCard, match_score: u32) -> Self {
        Self { card, match_score }
    }
}

/// Ranked matches with request metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    /// Best matches first, at most `max_results`
    pub matches: Vec<ScoredCard>,

    /// Number of cards retrieved as candidates
    pub candidate_pool_size: usize,

    /// Candidate retrieval failed and matching fell back to an empty pool
    #[serde(default)]
    pub degraded: bool,

    /// Matching latency in milliseconds
    pub latency_ms: f64,

    /// Ranker used (e.g. "weighted")
    pub ranking_method: String,
}

impl MatchResponse {
    /// Response for a request that produced no candidates at all
    pub fn empty(ranking_method: impl Into<String>, degraded: bool, latency_ms: f64) -> Self {
        Self {
            matches: Vec::new(),
            candidate_pool_size: 0,
            degraded,
            latency_ms,
            ranking_method: ranking_method.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Highest score in the response, if any
    pub fn best_score(&self) -> Option<u32> {
        self.matches.first().map(|m| m.match_score)
    }

    /// Get display string for logging
    pub fn display(&self) -> String {
        format!(
            "{} matches from {} candidates [{}] {:.2}ms{}",
            self.matches.len(),
            self.candidate_pool_size,
            self.ranking_method,
            self.latency_ms,
            if self.degraded { " (degraded)" } else { "" }
        )
    }
}
