use crate::core::{GoalCard, NewGoalCard, ScoredCard};
use crate::ranking::{score, Ranker};

/// Scores must be strictly above this to be shown
pub const DEFAULT_MIN_SCORE: u32 = 12;

/// Results returned per request
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Additive-weight ranker with a score threshold and a result cap
#[derive(Debug, Clone)]
pub struct WeightedRanker {
    min_score: u32,
    max_results: usize,
}

impl WeightedRanker {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MIN_SCORE, DEFAULT_MAX_RESULTS)
    }

    pub fn with_limits(min_score: u32, max_results: usize) -> Self {
        Self { min_score, max_results }
    }

    pub fn min_score(&self) -> u32 {
        self.min_score
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

impl Default for WeightedRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl Ranker for WeightedRanker {
    fn rank(&self, new_card: &NewGoalCard, candidates: &[GoalCard]) -> Vec<ScoredCard> {
        let mut ranked: Vec<ScoredCard> = candidates
            .iter()
            .filter_map(|candidate| {
                let match_score = score(new_card, candidate);
                (match_score > self.min_score && !is_near_duplicate(new_card, candidate))
                    .then(|| ScoredCard::new(candidate.clone(), match_score))
            })
            .collect();

        // Stable: equal scores keep pool order
        ranked.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        ranked.truncate(self.max_results);

        tracing::debug!(
            "Ranked {} candidates, kept {} (min_score > {})",
            candidates.len(),
            ranked.len(),
            self.min_score
        );

        ranked
    }

    fn name(&self) -> &str {
        "weighted"
    }
}

/// Rank `pool` against `new_card` with the default threshold and cap
pub fn find_matches(new_card: &NewGoalCard, pool: &[GoalCard]) -> Vec<ScoredCard> {
    WeightedRanker::new().rank(new_card, pool)
}

/// True when `candidate` is the submitted card itself or an identical
/// resubmission: same description, handle, skill level, goal type and tag
/// multiset. Ids are not compared.
pub fn is_near_duplicate(new_card: &NewGoalCard, candidate: &GoalCard) -> bool {
    candidate.description == new_card.description
        && candidate.contact_handle == new_card.contact_handle
        && candidate.skill_level == new_card.skill_level
        && candidate.goal_type == new_card.goal_type
        && sorted_tags(&candidate.tech_tags) == sorted_tags(&new_card.tech_tags)
}

fn sorted_tags(tags: &[String]) -> Vec<&str> {
    let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted
}
