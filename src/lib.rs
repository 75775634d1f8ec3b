//! # Goal Match Engine
//!
//! Matchmaking core for short-lived goal cards:
//! - Weighted, additive compatibility scoring (skill, vibe, goal, tags,
//!   timezone, availability)
//! - Threshold filtering, self-duplicate removal and top-N ranking
//! - SQLite card store with an age-bounded candidate pool
//! - Card workflows: submit, edit, delete, list, relist
//! - Multiple interfaces: Rust library, HTTP API, CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use goal_match_engine::{ContactMethod, GoalType, MatchEngine, NewGoalCard, SkillLevel, Vibe};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = MatchEngine::new("goalcards.db").await?;
//!
//!     let submitted = engine.submit_card("user-42", NewGoalCard {
//!         goal_type: GoalType::Build,
//!         skill_level: SkillLevel::Intermediate,
//!         vibe: Vibe::Focused,
//!         tech_tags: vec!["rust".to_string(), "api".to_string()],
//!         description: "Shipping a small REST service".to_string(),
//!         contact_method: ContactMethod::Discord,
//!         contact_handle: "ferris".to_string(),
//!         email: None,
//!         timezone: Some("GMT+1".to_string()),
//!         availability: None,
//!     }).await?;
//!
//!     for m in &submitted.matches.matches {
//!         println!("{} - {}", m.card.summary(), m.match_score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod store;
pub mod ranking;
pub mod engine;
pub mod config;
pub mod error;

// Re-export primary types
pub use crate::core::{ContactMethod, GoalCard, GoalType, MatchResponse, NewGoalCard, ScoredCard, SkillLevel, Vibe};
pub use engine::{MatchEngine, MatchOptions, SubmittedCard};
pub use config::EngineConfig;
pub use error::{MatchEngineError, Result};
pub use store::{CardStore, SqliteCardStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
