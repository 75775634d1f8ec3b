pub mod goal_card;
pub mod match_response;

pub use goal_card::{ContactMethod, GoalCard, GoalType, NewGoalCard, SkillLevel, Vibe};
pub use match_response::{MatchResponse, ScoredCard};
