//! SQLite store for DMCA reports and consent logs
//!
//! Both tables are insert-only; a trigger rejects updates to stored verdicts.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, FromRow};

use super::parse_timestamp;
use crate::domain::{
    ConsentLog, ConsentVerdict, DetectionMethod, DmcaReport, FlagRecord, FlagSource,
    InfringementVerdict,
};
use crate::infra::{ComplianceError, FlagSourceReader, ReportStore, Result};

/// SQLite-backed report store
#[derive(Clone)]
pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Count of stored DMCA reports
    pub async fn dmca_report_count(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dmca_reports")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    /// Count of stored consent logs
    pub async fn consent_log_count(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM consent_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn insert_dmca_report(
        &self,
        file_path: &str,
        uploader_id: &str,
        verdict: &InfringementVerdict,
    ) -> Result<DmcaReport> {
        let result = sqlx::query(
            r#"
            INSERT INTO dmca_reports (
                file_path, uploader_id, violation, method, details, content_hash, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(file_path)
        .bind(uploader_id)
        .bind(verdict.violation)
        .bind(verdict.method.as_str())
        .bind(&verdict.details)
        .bind(&verdict.content_hash)
        .bind(verdict.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(DmcaReport {
            id: result.last_insert_rowid(),
            file_path: file_path.to_string(),
            uploader_id: uploader_id.to_string(),
            verdict: verdict.clone(),
        })
    }

    async fn insert_consent_log(
        &self,
        document_path: &str,
        subject_id: &str,
        verdict: &ConsentVerdict,
    ) -> Result<ConsentLog> {
        let result = sqlx::query(
            r#"
            INSERT INTO consent_logs (
                document_path, subject_id, valid, reason, document_hash, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document_path)
        .bind(subject_id)
        .bind(verdict.valid)
        .bind(&verdict.reason)
        .bind(&verdict.document_hash)
        .bind(verdict.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ConsentLog {
            id: result.last_insert_rowid(),
            document_path: document_path.to_string(),
            subject_id: subject_id.to_string(),
            verdict: verdict.clone(),
        })
    }

    async fn recent_dmca_reports(&self, limit: u32) -> Result<Vec<DmcaReport>> {
        let rows = sqlx::query_as::<_, DmcaReportRow>(
            r#"
            SELECT id, file_path, uploader_id, violation, method, details, content_hash, timestamp
            FROM dmca_reports
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DmcaReport::try_from).collect()
    }

    async fn recent_consent_logs(&self, limit: u32) -> Result<Vec<ConsentLog>> {
        let rows = sqlx::query_as::<_, ConsentLogRow>(
            r#"
            SELECT id, document_path, subject_id, valid, reason, document_hash, timestamp
            FROM consent_logs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ConsentLog::try_from).collect()
    }
}

/// DMCA reports that found a violation, read as flags
#[derive(Clone)]
pub struct DmcaViolationFlags {
    pool: SqlitePool,
}

impl DmcaViolationFlags {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlagSourceReader for DmcaViolationFlags {
    fn source(&self) -> FlagSource {
        FlagSource::Dmca
    }

    async fn read_recent(&self, window: u32, after_id: i64) -> Result<Vec<FlagRecord>> {
        let rows = sqlx::query_as::<_, DmcaReportRow>(
            r#"
            SELECT id, file_path, uploader_id, violation, method, details, content_hash, timestamp
            FROM dmca_reports
            WHERE violation = 1 AND id > ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(after_id)
        .bind(window as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().rev().map(DmcaReportRow::into_flag).collect()
    }
}

/// Consent validations that failed, read as flags
#[derive(Clone)]
pub struct ConsentFailureFlags {
    pool: SqlitePool,
}

impl ConsentFailureFlags {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlagSourceReader for ConsentFailureFlags {
    fn source(&self) -> FlagSource {
        FlagSource::Consent
    }

    async fn read_recent(&self, window: u32, after_id: i64) -> Result<Vec<FlagRecord>> {
        let rows = sqlx::query_as::<_, ConsentLogRow>(
            r#"
            SELECT id, document_path, subject_id, valid, reason, document_hash, timestamp
            FROM consent_logs
            WHERE valid = 0 AND id > ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(after_id)
        .bind(window as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().rev().map(ConsentLogRow::into_flag).collect()
    }
}

/// Raw row from dmca_reports
#[derive(Debug, FromRow)]
struct DmcaReportRow {
    id: i64,
    file_path: String,
    uploader_id: String,
    violation: bool,
    method: String,
    details: String,
    content_hash: String,
    timestamp: String,
}

impl DmcaReportRow {
    fn into_flag(self) -> Result<FlagRecord> {
        let report = DmcaReport::try_from(self)?;
        let id = report.id;
        match serde_json::to_value(report)? {
            serde_json::Value::Object(fields) => Ok(FlagRecord { id, fields }),
            _ => Err(ComplianceError::Internal("report is not an object".into())),
        }
    }
}

impl TryFrom<DmcaReportRow> for DmcaReport {
    type Error = ComplianceError;

    fn try_from(row: DmcaReportRow) -> Result<Self> {
        let method = row
            .method
            .parse::<DetectionMethod>()
            .map_err(ComplianceError::Internal)?;

        Ok(DmcaReport {
            id: row.id,
            file_path: row.file_path,
            uploader_id: row.uploader_id,
            verdict: InfringementVerdict {
                violation: row.violation,
                method,
                details: row.details,
                content_hash: row.content_hash,
                timestamp: parse_timestamp("timestamp", &row.timestamp)?,
            },
        })
    }
}

/// Raw row from consent_logs
#[derive(Debug, FromRow)]
struct ConsentLogRow {
    id: i64,
    document_path: String,
    subject_id: String,
    valid: bool,
    reason: String,
    document_hash: String,
    timestamp: String,
}

impl ConsentLogRow {
    fn into_flag(self) -> Result<FlagRecord> {
        let log = ConsentLog::try_from(self)?;
        let id = log.id;
        match serde_json::to_value(log)? {
            serde_json::Value::Object(fields) => Ok(FlagRecord { id, fields }),
            _ => Err(ComplianceError::Internal("consent log is not an object".into())),
        }
    }
}

impl TryFrom<ConsentLogRow> for ConsentLog {
    type Error = ComplianceError;

    fn try_from(row: ConsentLogRow) -> Result<Self> {
        Ok(ConsentLog {
            id: row.id,
            document_path: row.document_path,
            subject_id: row.subject_id,
            verdict: ConsentVerdict {
                valid: row.valid,
                reason: row.reason,
                document_hash: row.document_hash,
                timestamp: parse_timestamp("timestamp", &row.timestamp)?,
            },
        })
    }
}
