//! Additive compatibility scoring between a submitted card and a candidate.
//!
//! Every signal contributes a non-negative amount; the total is the plain sum.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::{GoalCard, GoalType, NewGoalCard, SkillLevel, Vibe};
use crate::ranking::timezone::{has_stated_timezone, parse_timezone_offset};

pub const SKILL_EXACT: u32 = 15;
pub const SKILL_ADJACENT: u32 = 8;
pub const SKILL_DISTANT: u32 = 2;
pub const VIBE_MATCH: u32 = 10;
pub const GOAL_TYPE_MATCH: u32 = 5;
pub const TAG_SHARED: u32 = 10;
pub const TAG_PERFECT_BONUS: u32 = 5;
pub const TIMEZONE_NEAR: u32 = 8;
pub const TIMEZONE_MID: u32 = 3;
pub const TIMEZONE_BOTH_UNKNOWN: u32 = 1;
pub const AVAILABILITY_PER_SLOT: u32 = 2;
pub const AVAILABILITY_CAP: u32 = 5;

/// Offsets within this distance count as near
const TIMEZONE_NEAR_MINUTES: u32 = 3 * 60;
/// Offsets within this distance count as reachable
const TIMEZONE_MID_MINUTES: u32 = 6 * 60;

/// Per-signal contributions of one score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skill: u32,
    pub vibe: u32,
    pub goal_type: u32,
    pub tags: u32,
    pub timezone: u32,
    pub availability: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.skill + self.vibe + self.goal_type + self.tags + self.timezone + self.availability
    }
}

/// Score `candidate` against the just-submitted `new_card`
pub fn score(new_card: &NewGoalCard, candidate: &GoalCard) -> u32 {
    breakdown(new_card, candidate).total()
}

/// Same as [`score`], keeping each signal separate
pub fn breakdown(new_card: &NewGoalCard, candidate: &GoalCard) -> ScoreBreakdown {
    ScoreBreakdown {
        skill: skill_score(candidate.skill_level, new_card.skill_level),
        vibe: vibe_score(candidate.vibe, new_card.vibe),
        goal_type: goal_type_score(candidate.goal_type, new_card.goal_type),
        tags: tag_score(&new_card.tech_tags, &candidate.tech_tags),
        timezone: timezone_score(new_card.timezone.as_deref(), candidate.timezone.as_deref()),
        availability: availability_score(
            candidate.availability.as_deref(),
            new_card.availability.as_deref(),
        ),
    }
}

/// Symmetric skill affinity. `Unknown` never earns points.
pub fn skill_score(a: SkillLevel, b: SkillLevel) -> u32 {
    use SkillLevel::*;

    match (a, b) {
        (Unknown, _) | (_, Unknown) => 0,
        _ if a == b => SKILL_EXACT,
        (Intermediate, Beginner | Advanced) | (Beginner | Advanced, Intermediate) => SKILL_ADJACENT,
        (Beginner, Advanced) | (Advanced, Beginner) => SKILL_DISTANT,
        _ => 0,
    }
}

pub fn vibe_score(a: Vibe, b: Vibe) -> u32 {
    if a.is_known() && a == b { VIBE_MATCH } else { 0 }
}

pub fn goal_type_score(a: GoalType, b: GoalType) -> u32 {
    if a.is_known() && a == b { GOAL_TYPE_MATCH } else { 0 }
}

/// +10 per shared tag, +5 more when both tag sets are identical
pub fn tag_score(new_tags: &[String], candidate_tags: &[String]) -> u32 {
    let new_set: HashSet<&str> = new_tags.iter().map(String::as_str).collect();
    let candidate_set: HashSet<&str> = candidate_tags.iter().map(String::as_str).collect();

    let shared = new_set.intersection(&candidate_set).count() as u32;
    if shared == 0 {
        return 0;
    }

    let mut score = TAG_SHARED * shared;
    if shared as usize == new_set.len() && shared as usize == candidate_set.len() {
        score += TAG_PERFECT_BONUS;
    }
    score
}

/// Timezone proximity.
///
/// Numeric comparison only happens when the new card's label parses. When it
/// doesn't, the candidate earns a consolation point if it states no timezone
/// either. A candidate without a timezone earns nothing against a new card
/// that has one.
pub fn timezone_score(new_tz: Option<&str>, candidate_tz: Option<&str>) -> u32 {
    match parse_timezone_offset(new_tz) {
        Some(new_offset) => match parse_timezone_offset(candidate_tz) {
            Some(candidate_offset) => {
                let distance = new_offset.distance_minutes(&candidate_offset);
                if distance <= TIMEZONE_NEAR_MINUTES {
                    TIMEZONE_NEAR
                } else if distance <= TIMEZONE_MID_MINUTES {
                    TIMEZONE_MID
                } else {
                    0
                }
            }
            None => 0,
        },
        None if !has_stated_timezone(candidate_tz) => TIMEZONE_BOTH_UNKNOWN,
        None => 0,
    }
}

/// 2 points per shared slot, capped at 5
pub fn availability_score(a: Option<&[String]>, b: Option<&[String]>) -> u32 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0;
    };
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let overlap = a.intersection(&b).count() as u32;

    (overlap * AVAILABILITY_PER_SLOT).min(AVAILABILITY_CAP)
}
