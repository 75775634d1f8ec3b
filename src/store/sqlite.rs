use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::core::{ContactMethod, GoalCard, GoalType, NewGoalCard, SkillLevel, Vibe};
use crate::error::{MatchEngineError, Result};
use crate::store::{window_start, CardFilter, CardStore, Page, PageRequest, RelistToken, StoreStats};

const CARD_COLUMNS: &str = "id, created_at, owner_id, goal_type, skill_level, vibe, tech_tags, \
     description, contact_method, contact_handle, email, timezone, availability";

/// SQLite-based goal card store
///
/// Schema:
/// ```sql
/// CREATE TABLE cards (
///     id TEXT PRIMARY KEY,
///     created_at TEXT NOT NULL,
///     owner_id TEXT NOT NULL,
///     goal_type TEXT NOT NULL,
///     skill_level TEXT NOT NULL,
///     vibe TEXT NOT NULL,
///     tech_tags TEXT NOT NULL,        -- JSON array
///     description TEXT NOT NULL,
///     contact_method TEXT NOT NULL,
///     contact_handle TEXT NOT NULL,
///     email TEXT,
///     timezone TEXT,
///     availability TEXT               -- JSON array or NULL
/// );
/// CREATE TABLE relist_tokens (
///     token TEXT PRIMARY KEY,
///     card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
///     expires_at TEXT NOT NULL
/// );
/// ```
///
/// Timestamps are fixed-width RFC 3339 (microseconds, `Z`), so string
/// comparison in SQL is chronological.
pub struct SqliteCardStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCardStore {
    /// Open (or create) the store at `db_path`; ":memory:" works for tests
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                goal_type TEXT NOT NULL,
                skill_level TEXT NOT NULL,
                vibe TEXT NOT NULL,
                tech_tags TEXT NOT NULL,
                description TEXT NOT NULL,
                contact_method TEXT NOT NULL,
                contact_handle TEXT NOT NULL,
                email TEXT,
                timezone TEXT,
                availability TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_cards_created_at ON cards(created_at);
             CREATE INDEX IF NOT EXISTS idx_cards_owner ON cards(owner_id);
             CREATE TABLE IF NOT EXISTS relist_tokens (
                token TEXT PRIMARY KEY,
                card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL
             );",
        )?;

        tracing::debug!("Opened card store at {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MatchEngineError::Store("connection mutex poisoned".to_string()))
    }
}

fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decode_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decode_json_list(idx: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_card(row: &Row<'_>) -> rusqlite::Result<GoalCard> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(1)?;
    let goal_type: String = row.get(3)?;
    let skill_level: String = row.get(4)?;
    let vibe: String = row.get(5)?;
    let tech_tags: String = row.get(6)?;
    let contact_method: String = row.get(8)?;
    let availability: Option<String> = row.get(12)?;

    Ok(GoalCard {
        id: decode_uuid(0, &id)?,
        created_at: decode_timestamp(1, &created_at)?,
        owner_id: row.get(2)?,
        goal_type: GoalType::from(goal_type.as_str()),
        skill_level: SkillLevel::from(skill_level.as_str()),
        vibe: Vibe::from(vibe.as_str()),
        tech_tags: decode_json_list(6, &tech_tags)?,
        description: row.get(7)?,
        contact_method: ContactMethod::from(contact_method.as_str()),
        contact_handle: row.get(9)?,
        email: row.get(10)?,
        timezone: row.get(11)?,
        availability: availability
            .map(|raw| decode_json_list(12, &raw))
            .transpose()?,
    })
}

/// WHERE clause and bound values for a listing filter
fn filter_clause(filter: &CardFilter, now: DateTime<Utc>) -> Result<(String, Vec<Value>)> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(goal_type) = filter.goal_type {
        conditions.push("goal_type = ?");
        values.push(Value::Text(goal_type.as_str().to_string()));
    }
    if let Some(skill_level) = filter.skill_level {
        conditions.push("skill_level = ?");
        values.push(Value::Text(skill_level.as_str().to_string()));
    }
    if let Some(tag) = &filter.tech_tag {
        conditions.push("EXISTS (SELECT 1 FROM json_each(cards.tech_tags) WHERE json_each.value = ?)");
        values.push(Value::Text(tag.trim().to_lowercase()));
    }
    if let Some(owner_id) = &filter.owner_id {
        conditions.push("owner_id = ?");
        values.push(Value::Text(owner_id.clone()));
    }
    if let Some(days) = filter.max_age_days {
        conditions.push("created_at > ?");
        values.push(Value::Text(encode_timestamp(window_start(now, days)?)));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    Ok((clause, values))
}

#[async_trait]
impl CardStore for SqliteCardStore {
    async fn insert(&self, owner_id: &str, card: &NewGoalCard, now: DateTime<Utc>) -> Result<GoalCard> {
        let stored = GoalCard::from_new(Uuid::new_v4(), owner_id, now, card.clone());
        let tech_tags = serde_json::to_string(&stored.tech_tags)?;
        let availability = stored
            .availability
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO cards ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                CARD_COLUMNS
            ),
            params![
                stored.id.to_string(),
                encode_timestamp(stored.created_at),
                stored.owner_id,
                stored.goal_type.as_str(),
                stored.skill_level.as_str(),
                stored.vibe.as_str(),
                tech_tags,
                stored.description,
                stored.contact_method.as_str(),
                stored.contact_handle,
                stored.email,
                stored.timezone,
                availability,
            ],
        )?;

        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Option<GoalCard>> {
        let conn = self.conn()?;

        let card = conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ?", CARD_COLUMNS),
                params![id.to_string()],
                row_to_card,
            )
            .optional()?;

        Ok(card)
    }

    async fn update(&self, card: &GoalCard) -> Result<bool> {
        let tech_tags = serde_json::to_string(&card.tech_tags)?;
        let availability = card
            .availability
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE cards SET goal_type = ?2, skill_level = ?3, vibe = ?4, tech_tags = ?5,
                description = ?6, contact_method = ?7, contact_handle = ?8, email = ?9,
                timezone = ?10, availability = ?11
             WHERE id = ?1",
            params![
                card.id.to_string(),
                card.goal_type.as_str(),
                card.skill_level.as_str(),
                card.vibe.as_str(),
                tech_tags,
                card.description,
                card.contact_method.as_str(),
                card.contact_handle,
                card.email,
                card.timezone,
                availability,
            ],
        )?;

        Ok(updated > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM cards WHERE id = ?", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    async fn fetch_recent_cards(
        &self,
        now: DateTime<Utc>,
        max_age_days: i64,
        limit: usize,
    ) -> Result<Vec<GoalCard>> {
        let cutoff = encode_timestamp(window_start(now, max_age_days)?);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cards WHERE created_at > ?1 ORDER BY created_at DESC LIMIT ?2",
            CARD_COLUMNS
        ))?;

        let cards = stmt
            .query_map(params![cutoff, limit], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(cards)
    }

    async fn list(
        &self,
        filter: &CardFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> Result<Page<GoalCard>> {
        let page = PageRequest::new(page.page, page.per_page);
        let (clause, values) = filter_clause(filter, now)?;

        let conn = self.conn()?;

        let total: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM cards{}", clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let mut paged = values;
        paged.push(Value::Integer(i64::from(page.per_page)));
        paged.push(Value::Integer(i64::try_from(page.offset()).unwrap_or(i64::MAX)));

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cards{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            CARD_COLUMNS, clause
        ))?;
        let items = stmt
            .query_map(params_from_iter(paged.iter()), row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page: page.page,
            per_page: page.per_page,
            total,
        })
    }

    async fn touch(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE cards SET created_at = ?2 WHERE id = ?1",
            params![id.to_string(), encode_timestamp(now)],
        )?;
        Ok(updated > 0)
    }

    async fn save_relist_token(&self, token: &RelistToken) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO relist_tokens (token, card_id, expires_at) VALUES (?1, ?2, ?3)",
            params![
                token.token,
                token.card_id.to_string(),
                encode_timestamp(token.expires_at),
            ],
        )?;
        Ok(())
    }

    async fn get_relist_token(&self, token: &str) -> Result<Option<RelistToken>> {
        let conn = self.conn()?;

        let found = conn
            .query_row(
                "SELECT token, card_id, expires_at FROM relist_tokens WHERE token = ?",
                params![token],
                |row| {
                    let card_id: String = row.get(1)?;
                    let expires_at: String = row.get(2)?;
                    Ok(RelistToken {
                        token: row.get(0)?,
                        card_id: decode_uuid(1, &card_id)?,
                        expires_at: decode_timestamp(2, &expires_at)?,
                    })
                },
            )
            .optional()?;

        Ok(found)
    }

    async fn delete_relist_token(&self, token: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM relist_tokens WHERE token = ?", params![token])?;
        Ok(deleted > 0)
    }

    async fn stats(&self, now: DateTime<Utc>, max_age_days: i64) -> Result<StoreStats> {
        let cutoff = encode_timestamp(window_start(now, max_age_days)?);
        let conn = self.conn()?;

        let total_cards: u64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;

        let active_cards: u64 = conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE created_at > ?",
            params![cutoff],
            |row| row.get(0),
        )?;

        let relist_tokens: u64 =
            conn.query_row("SELECT COUNT(*) FROM relist_tokens", [], |row| row.get(0))?;

        let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM cards",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let oldest_card = oldest.map(|raw| decode_timestamp(0, &raw)).transpose()?;
        let newest_card = newest.map(|raw| decode_timestamp(1, &raw)).transpose()?;

        Ok(StoreStats {
            total_cards,
            active_cards,
            relist_tokens,
            oldest_card,
            newest_card,
        })
    }
}
