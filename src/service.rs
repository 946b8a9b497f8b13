//! Compliance service: verifiers, persistence and escalation behind one
//! handle

use std::path::Path;
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::config::Config;
use crate::domain::{ConsentLog, ConsentVerdict, DmcaReport, EscalationEntry, FlagSource, InfringementVerdict};
use crate::escalation::EscalationAggregator;
use crate::infra::{
    AuditSink, ConsentFailureFlags, DmcaViolationFlags, ExactMetadataMatcher, FlagSourceReader,
    NoopReverseSearch, NoopWatermarkDetector, PlainTextExtractor, ReportStore, Result,
    SqliteAuditLog, SqliteChatFlags, SqliteEscalationStore, SqliteHashRegistry,
    SqliteReportStore, SqliteSentimentLog, SqliteVault,
};
use crate::verify::{Collaborators, ConsentVerifier, DmcaVerifier, VerifierConfig};

pub struct ComplianceService {
    dmca: DmcaVerifier,
    consent: ConsentVerifier,
    aggregator: EscalationAggregator,
    reports: Arc<dyn ReportStore>,
}

impl ComplianceService {
    pub fn new(
        collaborators: &Collaborators,
        config: &VerifierConfig,
        reports: Arc<dyn ReportStore>,
        aggregator: EscalationAggregator,
    ) -> Self {
        Self {
            dmca: DmcaVerifier::new(collaborators, config),
            consent: ConsentVerifier::new(collaborators, config),
            aggregator,
            reports,
        }
    }

    /// Wire the baseline SQLite stack onto an already migrated pool
    pub fn sqlite(pool: SqlitePool, config: &Config) -> Self {
        let audit: Arc<dyn AuditSink> = Arc::new(SqliteAuditLog::new(pool.clone()));

        let collaborators = Collaborators {
            hash_registry: Arc::new(SqliteHashRegistry::new(pool.clone())),
            watermark_detector: Arc::new(NoopWatermarkDetector),
            reverse_search: Arc::new(NoopReverseSearch),
            text_extractor: Arc::new(PlainTextExtractor),
            metadata_matcher: Arc::new(ExactMetadataMatcher),
            vault: Arc::new(SqliteVault::new(pool.clone())),
            audit: audit.clone(),
        };

        let sources: Vec<Arc<dyn FlagSourceReader>> = FlagSource::ALL
            .iter()
            .map(|source| -> Arc<dyn FlagSourceReader> {
                match source {
                    FlagSource::Sentiment => Arc::new(SqliteSentimentLog::new(pool.clone())),
                    FlagSource::Dmca => Arc::new(DmcaViolationFlags::new(pool.clone())),
                    FlagSource::Consent => Arc::new(ConsentFailureFlags::new(pool.clone())),
                    FlagSource::Chat => Arc::new(SqliteChatFlags::new(pool.clone())),
                }
            })
            .collect();

        let aggregator = EscalationAggregator::new(
            sources,
            Arc::new(SqliteEscalationStore::new(pool.clone())),
            audit,
        )
        .with_keywords(&config.violence_keywords);

        Self::new(
            &collaborators,
            &config.verifier_config(),
            Arc::new(SqliteReportStore::new(pool)),
            aggregator,
        )
    }

    /// Verify a file and persist one DMCA report
    ///
    /// Errors only when the report cannot be stored.
    #[instrument(skip(self, file_path), fields(file_path = %file_path.display()))]
    pub async fn check_dmca(&self, file_path: &Path, uploader_id: &str) -> Result<InfringementVerdict> {
        let verdict = self.dmca.check(file_path, uploader_id).await;
        let report = self
            .reports
            .insert_dmca_report(&file_path.to_string_lossy(), uploader_id, &verdict)
            .await?;
        info!(report_id = report.id, violation = verdict.violation, "DMCA report stored");
        Ok(verdict)
    }

    /// Validate a consent document and persist one consent log
    ///
    /// Errors only when the log cannot be stored.
    #[instrument(skip(self, document_path), fields(document_path = %document_path.display()))]
    pub async fn validate_consent(&self, document_path: &Path, subject_id: &str) -> Result<ConsentVerdict> {
        let verdict = self.consent.validate(document_path, subject_id).await;
        let log = self
            .reports
            .insert_consent_log(&document_path.to_string_lossy(), subject_id, &verdict)
            .await?;
        info!(log_id = log.id, valid = verdict.valid, "Consent log stored");
        Ok(verdict)
    }

    pub async fn run_escalation(&self, window: u32) -> Result<Vec<EscalationEntry>> {
        self.aggregator.escalate(window).await
    }

    pub async fn recent_dmca_reports(&self, limit: u32) -> Result<Vec<DmcaReport>> {
        self.reports.recent_dmca_reports(limit).await
    }

    pub async fn recent_consent_logs(&self, limit: u32) -> Result<Vec<ConsentLog>> {
        self.reports.recent_consent_logs(limit).await
    }
}
