//! Audit logging for compliance decisions
//!
//! Records are append-only: the schema rejects UPDATE and DELETE on
//! `audit_events`, and insertion order (the row id) is the event order.
//! Recording never fails the caller; storage errors go to `tracing`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use crate::domain::{AuditEvent, AuditEventKind, StoredAuditEvent};
use crate::infra::sqlite::parse_timestamp;
use crate::infra::{AuditSink, ComplianceError, Result};

/// SQLite-backed audit logger
#[derive(Clone)]
pub struct SqliteAuditLog {
    pool: SqlitePool,
}

impl SqliteAuditLog {
    /// Create a new audit logger
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fire-and-forget record of a named event
    pub async fn record_event(&self, event_name: AuditEventKind, payload: serde_json::Value) {
        self.record(AuditEvent::new(event_name, payload)).await;
    }

    /// Insert an audit event, surfacing storage errors
    pub async fn try_record(&self, event: &AuditEvent) -> Result<i64> {
        let payload = serde_json::to_string(&event.payload)?;
        let result = sqlx::query(
            r#"
            INSERT INTO audit_events (event_name, payload, timestamp)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(event.event_name.to_string())
        .bind(&payload)
        .bind(event.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Query audit events, newest first
    pub async fn list(&self, filters: AuditQueryFilters, limit: i64) -> Result<Vec<StoredAuditEvent>> {
        let rows = sqlx::query_as::<_, AuditEventRow>(
            r#"
            SELECT id, event_name, payload, timestamp
            FROM audit_events
            WHERE (?1 IS NULL OR event_name = ?1)
              AND (?2 IS NULL OR timestamp >= ?2)
              AND (?3 IS NULL OR timestamp <= ?3)
            ORDER BY id DESC
            LIMIT ?4
            "#,
        )
        .bind(filters.event_name.as_ref().map(|k| k.to_string()))
        .bind(filters.from.map(|t| t.to_rfc3339()))
        .bind(filters.to.map(|t| t.to_rfc3339()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredAuditEvent::try_from).collect()
    }

    /// Count audit events
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl AuditSink for SqliteAuditLog {
    async fn record(&self, event: AuditEvent) {
        match self.try_record(&event).await {
            Ok(id) => {
                tracing::info!(
                    audit_id = id,
                    event = %event.event_name,
                    payload = %event.payload,
                    "Audit event recorded"
                );
            }
            Err(e) => {
                tracing::error!(
                    event = %event.event_name,
                    payload = %event.payload,
                    error = %e,
                    "Failed to persist audit event"
                );
            }
        }
    }
}

/// Query filters for audit events
#[derive(Debug, Default)]
pub struct AuditQueryFilters {
    pub event_name: Option<AuditEventKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Database row for audit events
#[derive(Debug, sqlx::FromRow)]
struct AuditEventRow {
    id: i64,
    event_name: String,
    payload: String,
    timestamp: String,
}

impl TryFrom<AuditEventRow> for StoredAuditEvent {
    type Error = ComplianceError;

    fn try_from(row: AuditEventRow) -> Result<Self> {
        let payload = serde_json::from_str(&row.payload)
            .map_err(|e| ComplianceError::Internal(format!("Invalid payload JSON: {}", e)))?;

        Ok(StoredAuditEvent {
            id: row.id,
            event: AuditEvent {
                event_name: AuditEventKind::parse(&row.event_name),
                payload,
                timestamp: parse_timestamp("timestamp", &row.timestamp)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite::{connect_in_memory, initialize};
    use serde_json::json;

    async fn create_test_log() -> (SqliteAuditLog, SqlitePool) {
        let pool = connect_in_memory().await.unwrap();
        initialize(&pool).await.unwrap();
        (SqliteAuditLog::new(pool.clone()), pool)
    }

    #[tokio::test]
    async fn test_record_and_list_in_insertion_order() {
        let (log, _) = create_test_log().await;

        log.record_event(AuditEventKind::DmcaViolationDetected, json!({"n": 1}))
            .await;
        log.record_event(AuditEventKind::FlagEscalated, json!({"n": 2}))
            .await;
        log.record_event(AuditEventKind::FlagEscalated, json!({"n": 2}))
            .await;

        assert_eq!(log.count().await.unwrap(), 3);

        let all = log.list(AuditQueryFilters::default(), 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].id > all[1].id);
        assert_eq!(all[2].event.event_name, AuditEventKind::DmcaViolationDetected);

        let escalated = log
            .list(
                AuditQueryFilters {
                    event_name: Some(AuditEventKind::FlagEscalated),
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(escalated.len(), 2);
        assert_eq!(escalated[0].event.payload, escalated[1].event.payload);
    }

    #[tokio::test]
    async fn test_audit_events_reject_update_and_delete() {
        let (log, pool) = create_test_log().await;
        log.record_event(AuditEventKind::ConsentValidationPassed, json!({}))
            .await;

        assert!(sqlx::query("UPDATE audit_events SET event_name = 'x'")
            .execute(&pool)
            .await
            .is_err());
        assert!(sqlx::query("DELETE FROM audit_events")
            .execute(&pool)
            .await
            .is_err());
        assert_eq!(log.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_swallows_storage_failure() {
        // No migrations: the table does not exist
        let pool = connect_in_memory().await.unwrap();
        let log = SqliteAuditLog::new(pool);

        log.record_event(AuditEventKind::FlagEscalated, json!({"source": "chat"}))
            .await;

        let direct = log
            .try_record(&AuditEvent::new(AuditEventKind::FlagEscalated, json!({})))
            .await;
        assert!(matches!(direct, Err(ComplianceError::Database(_))));
    }
}
