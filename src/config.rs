use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::engine::MatchOptions;
use crate::error::{MatchEngineError, Result};

/// Runtime configuration, read from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// SQLite database path (`DB_PATH`)
    pub db_path: String,
    /// HTTP port (`PORT`)
    pub port: u16,
    pub match_options: MatchOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: "goalcards.db".to_string(),
            port: 8090,
            match_options: MatchOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&vars)
    }

    /// Load from a key/value map, falling back to defaults per key.
    ///
    /// A key that is present but does not parse is an error rather than a
    /// silent fallback.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            db_path: try_load(vars, "DB_PATH", defaults.db_path)?,
            port: try_load(vars, "PORT", defaults.port)?,
            match_options: MatchOptions::from_map(vars)?,
        })
    }
}

impl MatchOptions {
    /// Read `MATCH_*` / `RELIST_*` overrides from a key/value map
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let max_age_days = try_load(vars, "MATCH_POOL_MAX_AGE_DAYS", defaults.max_age_days)?;
        let relist_token_ttl_days =
            try_load(vars, "RELIST_TOKEN_TTL_DAYS", defaults.relist_token_ttl_days)?;

        Ok(Self {
            min_score: try_load(vars, "MATCH_MIN_SCORE", defaults.min_score)?,
            max_results: try_load(vars, "MATCH_MAX_RESULTS", defaults.max_results)?,
            max_age_days: check_days("MATCH_POOL_MAX_AGE_DAYS", max_age_days)?,
            pool_limit: try_load(vars, "MATCH_POOL_LIMIT", defaults.pool_limit)?,
            relist_token_ttl_days: check_days("RELIST_TOKEN_TTL_DAYS", relist_token_ttl_days)?,
        })
    }
}

/// Upper bound for day-count settings
pub const MAX_CONFIG_DAYS: i64 = 3650;

fn check_days(key: &str, days: i64) -> Result<i64> {
    if (1..=MAX_CONFIG_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(MatchEngineError::Config(format!(
            "{key} must be between 1 and {MAX_CONFIG_DAYS} days, got {days}"
        )))
    }
}

fn try_load<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MatchEngineError::Config(format!("invalid {key} value '{raw}': {e}"))),
        None => {
            tracing::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
