//! SQLite stores for flag producers and the escalation queue

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, FromRow};

use super::{parse_object, parse_timestamp};
use crate::domain::{
    ChatFlag, EscalationEntry, FlagRecord, FlagSource, Priority, SentimentRecord,
};
use crate::infra::{ComplianceError, EscalationStore, FlagSourceReader, Result};

/// Sentiment monitor log
#[derive(Clone)]
pub struct SqliteSentimentLog {
    pool: SqlitePool,
}

impl SqliteSentimentLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a sentiment record, returning its id
    pub async fn append(&self, record: &SentimentRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO sentiment_log (polarity, subjectivity, classification, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(record.polarity)
        .bind(record.subjectivity)
        .bind(record.classification.as_str())
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

#[derive(Debug, FromRow)]
struct SentimentRow {
    id: i64,
    polarity: f64,
    subjectivity: f64,
    classification: String,
    timestamp: String,
}

#[async_trait]
impl FlagSourceReader for SqliteSentimentLog {
    fn source(&self) -> FlagSource {
        FlagSource::Sentiment
    }

    async fn read_recent(&self, window: u32, after_id: i64) -> Result<Vec<FlagRecord>> {
        let rows = sqlx::query_as::<_, SentimentRow>(
            r#"
            SELECT id, polarity, subjectivity, classification, timestamp
            FROM sentiment_log
            WHERE id > ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(after_id)
        .bind(window as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .rev()
            .map(|row| FlagRecord {
                id: row.id,
                fields: object(serde_json::json!({
                    "id": row.id,
                    "polarity": row.polarity,
                    "subjectivity": row.subjectivity,
                    "classification": row.classification,
                    "timestamp": row.timestamp,
                })),
            })
            .collect())
    }
}

/// Chat moderation flags
#[derive(Clone)]
pub struct SqliteChatFlags {
    pool: SqlitePool,
}

impl SqliteChatFlags {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a flagged chat message, returning its id
    pub async fn append(&self, flag: &ChatFlag) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO chat_flags (message_id, user_id, details, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&flag.message_id)
        .bind(&flag.user_id)
        .bind(&flag.details)
        .bind(flag.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

#[derive(Debug, FromRow)]
struct ChatFlagRow {
    id: i64,
    message_id: String,
    user_id: String,
    details: String,
    timestamp: String,
}

#[async_trait]
impl FlagSourceReader for SqliteChatFlags {
    fn source(&self) -> FlagSource {
        FlagSource::Chat
    }

    async fn read_recent(&self, window: u32, after_id: i64) -> Result<Vec<FlagRecord>> {
        let rows = sqlx::query_as::<_, ChatFlagRow>(
            r#"
            SELECT id, message_id, user_id, details, timestamp
            FROM chat_flags
            WHERE id > ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(after_id)
        .bind(window as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .rev()
            .map(|row| FlagRecord {
                id: row.id,
                fields: object(serde_json::json!({
                    "id": row.id,
                    "message_id": row.message_id,
                    "user_id": row.user_id,
                    "details": row.details,
                    "timestamp": row.timestamp,
                })),
            })
            .collect())
    }
}

fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

/// Append-only escalation queue with per-source high-water marks
#[derive(Clone)]
pub struct SqliteEscalationStore {
    pool: SqlitePool,
}

impl SqliteEscalationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent escalations, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<EscalationEntry>> {
        let rows = sqlx::query_as::<_, EscalationRow>(
            r#"
            SELECT source, source_record_id, original_fields, priority, escalated_at
            FROM escalations
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EscalationEntry::try_from).collect()
    }
}

#[async_trait]
impl EscalationStore for SqliteEscalationStore {
    async fn high_water_marks(&self) -> Result<HashMap<FlagSource, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT source, last_record_id FROM escalation_marks")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(source, id)| {
                source
                    .parse::<FlagSource>()
                    .map(|s| (s, id))
                    .map_err(ComplianceError::Internal)
            })
            .collect()
    }

    async fn append(
        &self,
        entries: &[EscalationEntry],
        marks: &[(FlagSource, i64)],
    ) -> Result<Vec<EscalationEntry>> {
        if entries.is_empty() && marks.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(entries.len());

        for entry in entries {
            let fields = serde_json::to_string(&entry.original_fields)?;
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO escalations (
                    source, source_record_id, original_fields, priority, escalated_at
                ) VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.source.as_str())
            .bind(entry.source_record_id)
            .bind(&fields)
            .bind(entry.priority.as_str())
            .bind(entry.escalated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            // Zero rows: another run already escalated this record
            if result.rows_affected() == 1 {
                inserted.push(entry.clone());
            }
        }

        let now = Utc::now().to_rfc3339();
        for (source, last_id) in marks {
            sqlx::query(
                r#"
                INSERT INTO escalation_marks (source, last_record_id, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(source) DO UPDATE SET
                    last_record_id = MAX(last_record_id, excluded.last_record_id),
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(source.as_str())
            .bind(*last_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn count(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM escalations")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }
}

/// Raw row from escalations
#[derive(Debug, FromRow)]
struct EscalationRow {
    source: String,
    source_record_id: i64,
    original_fields: String,
    priority: String,
    escalated_at: String,
}

impl TryFrom<EscalationRow> for EscalationEntry {
    type Error = ComplianceError;

    fn try_from(row: EscalationRow) -> Result<Self> {
        Ok(EscalationEntry {
            source: row
                .source
                .parse::<FlagSource>()
                .map_err(ComplianceError::Internal)?,
            source_record_id: row.source_record_id,
            original_fields: parse_object("original_fields", &row.original_fields)?,
            priority: row
                .priority
                .parse::<Priority>()
                .map_err(ComplianceError::Internal)?,
            escalated_at: parse_timestamp("escalated_at", &row.escalated_at)?,
        })
    }
}
