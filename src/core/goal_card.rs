use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{MatchEngineError, Result};

/// Upper bound on tech tags per card
pub const MAX_TECH_TAGS: usize = 5;

/// Upper bound on description length, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 150;

/// Closed category enum stored and transported as an upper-case string.
///
/// Every enum gets an `Unknown` variant that absorbs values outside the
/// known set, so rows written by older clients still load.
macro_rules! card_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
            /// Value outside the known set
            #[serde(other, rename = "UNKNOWN")]
            Unknown,
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::Unknown => "UNKNOWN",
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Unknown)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self::from(s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

card_enum! {
    /// What the poster wants to do
    GoalType {
        Build => "BUILD",
        Learn => "LEARN",
        Solve => "SOLVE",
    }
}

card_enum! {
    /// Self-reported proficiency
    SkillLevel {
        Beginner => "BEGINNER",
        Intermediate => "INTERMEDIATE",
        Advanced => "ADVANCED",
    }
}

card_enum! {
    /// Working style
    Vibe {
        Casual => "CASUAL",
        Focused => "FOCUSED",
        Intense => "INTENSE",
    }
}

card_enum! {
    /// Channel behind `contact_handle`
    ContactMethod {
        Discord => "DISCORD",
        Telegram => "TELEGRAM",
        Linkedin => "LINKEDIN",
    }
}

/// A persisted goal card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalCard {
    /// Store-assigned identifier
    pub id: Uuid,

    /// Creation time, reset by relisting
    pub created_at: DateTime<Utc>,

    /// Authenticated creator
    pub owner_id: String,

    pub goal_type: GoalType,
    pub skill_level: SkillLevel,
    pub vibe: Vibe,

    /// Lowercase tags, 1-5 at creation time
    #[serde(default)]
    pub tech_tags: Vec<String>,

    #[serde(default)]
    pub description: String,

    pub contact_method: ContactMethod,

    #[serde(default)]
    pub contact_handle: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Free-text label such as "GMT+5:30" or "IST"; absent means unknown
    #[serde(default)]
    pub timezone: Option<String>,

    /// Opaque slot ids such as "MON_EVENING"
    #[serde(default)]
    pub availability: Option<Vec<String>>,
}

/// Card attributes as submitted, before the store assigns id/owner/timestamp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewGoalCard {
    pub goal_type: GoalType,
    pub skill_level: SkillLevel,
    pub vibe: Vibe,

    #[serde(default)]
    pub tech_tags: Vec<String>,

    #[serde(default)]
    pub description: String,

    pub contact_method: ContactMethod,

    #[serde(default)]
    pub contact_handle: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub availability: Option<Vec<String>>,
}

impl GoalCard {
    /// Materialize a submitted card with store-assigned fields
    pub fn from_new(
        id: Uuid,
        owner_id: impl Into<String>,
        created_at: DateTime<Utc>,
        card: NewGoalCard,
    ) -> Self {
        Self {
            id,
            created_at,
            owner_id: owner_id.into(),
            goal_type: card.goal_type,
            skill_level: card.skill_level,
            vibe: card.vibe,
            tech_tags: card.tech_tags,
            description: card.description,
            contact_method: card.contact_method,
            contact_handle: card.contact_handle,
            email: card.email,
            timezone: card.timezone,
            availability: card.availability,
        }
    }

    /// Overwrite every editable field, keeping id, owner and timestamp
    pub fn apply_edit(&mut self, card: NewGoalCard) {
        self.goal_type = card.goal_type;
        self.skill_level = card.skill_level;
        self.vibe = card.vibe;
        self.tech_tags = card.tech_tags;
        self.description = card.description;
        self.contact_method = card.contact_method;
        self.contact_handle = card.contact_handle;
        self.email = card.email;
        self.timezone = card.timezone;
        self.availability = card.availability;
    }

    /// One-line summary for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "{} / {} / {} [{}] {}",
            self.goal_type,
            self.skill_level,
            self.vibe,
            self.tech_tags.join(", "),
            self.description
        )
    }
}

impl From<&GoalCard> for NewGoalCard {
    fn from(card: &GoalCard) -> Self {
        Self {
            goal_type: card.goal_type,
            skill_level: card.skill_level,
            vibe: card.vibe,
            tech_tags: card.tech_tags.clone(),
            description: card.description.clone(),
            contact_method: card.contact_method,
            contact_handle: card.contact_handle.clone(),
            email: card.email.clone(),
            timezone: card.timezone.clone(),
            availability: card.availability.clone(),
        }
    }
}

impl NewGoalCard {
    /// Trim, lowercase and validate submitted input.
    ///
    /// Scoring never calls this; it runs in the submit and edit workflows
    /// before anything reaches the store.
    pub fn normalize(mut self) -> Result<Self> {
        if !self.goal_type.is_known() {
            return Err(MatchEngineError::Validation("unknown goal type".into()));
        }
        if !self.skill_level.is_known() {
            return Err(MatchEngineError::Validation("unknown skill level".into()));
        }
        if !self.vibe.is_known() {
            return Err(MatchEngineError::Validation("unknown vibe".into()));
        }
        if !self.contact_method.is_known() {
            return Err(MatchEngineError::Validation("unknown contact method".into()));
        }

        self.description = self.description.trim().to_string();
        if self.description.is_empty() {
            return Err(MatchEngineError::Validation("description is required".into()));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(MatchEngineError::Validation(format!(
                "description exceeds {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }

        self.contact_handle = self.contact_handle.trim().to_string();
        if self.contact_handle.is_empty() {
            return Err(MatchEngineError::Validation("contact handle is required".into()));
        }

        let mut seen = HashSet::new();
        let mut tags = Vec::with_capacity(self.tech_tags.len());
        for tag in &self.tech_tags {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() {
                return Err(MatchEngineError::Validation("tag cannot be empty".into()));
            }
            if !seen.insert(tag.clone()) {
                return Err(MatchEngineError::Validation(format!("duplicate tag '{}'", tag)));
            }
            tags.push(tag);
        }
        if tags.is_empty() || tags.len() > MAX_TECH_TAGS {
            return Err(MatchEngineError::Validation(format!(
                "use between 1 and {} tech tags",
                MAX_TECH_TAGS
            )));
        }
        self.tech_tags = tags;

        self.email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self.timezone = self
            .timezone
            .map(|tz| tz.trim().to_string())
            .filter(|tz| !tz.is_empty());
        self.availability = self.availability.filter(|slots| !slots.is_empty());

        Ok(self)
    }
}
