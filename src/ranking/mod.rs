pub mod score;
pub mod timezone;
pub mod weighted;

use crate::core::{GoalCard, NewGoalCard, ScoredCard};

pub use score::{breakdown, score, ScoreBreakdown};
pub use timezone::{parse_timezone_offset, TimezoneOffset};
pub use weighted::{find_matches, is_near_duplicate, WeightedRanker};

/// Trait for match ranking implementations
pub trait Ranker: Send + Sync {
    /// Score candidates against the submitted card, drop non-matches and
    /// return the survivors best first
    fn rank(&self, new_card: &NewGoalCard, candidates: &[GoalCard]) -> Vec<ScoredCard>;

    /// Get ranker name for logging
    fn name(&self) -> &str;
}
