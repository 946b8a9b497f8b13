//! Trait definitions for collaborators and stores
//!
//! External collaborators (hash registry, watermark detector, reverse
//! search, OCR, metadata matcher, vault) are consumed through these seams
//! and injected via [`Collaborators`](crate::verify::Collaborators).

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuditEvent, ConsentLog, ConsentVerdict, DmcaReport, EscalationEntry, FlagRecord, FlagSource,
    FormMetadata, InfringementVerdict, VaultRecord,
};

use super::Result;

/// Result of a watermark scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkFinding {
    pub violation: bool,
    pub details: String,
}

/// Result of a reverse content search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseSearchFinding {
    pub match_found: bool,
    pub details: String,
}

/// Registry of digests of known infringing content
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HashRegistry: Send + Sync {
    async fn lookup_known_hash(&self, hex_digest: &str) -> Result<bool>;
}

/// Detects infringing watermarks in media
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WatermarkDetector: Send + Sync {
    async fn detect_watermark(&self, file_path: &Path) -> Result<WatermarkFinding>;
}

/// Searches external indexes for copies of the content
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReverseSearch: Send + Sync {
    async fn reverse_content_search(&self, file_path: &Path) -> Result<ReverseSearchFinding>;
}

/// Extracts text from a document (OCR or otherwise)
///
/// Fails on unreadable or non-document input.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, file_path: &Path) -> Result<String>;
}

/// Compares extracted form metadata with a vault record
#[cfg_attr(test, automock)]
pub trait MetadataMatcher: Send + Sync {
    fn match_metadata(&self, extracted: &FormMetadata, vault_record: &VaultRecord) -> bool;
}

/// Secure store of release records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Vault: Send + Sync {
    async fn fetch_vault_record(&self, subject_id: &str) -> Result<Option<VaultRecord>>;
}

/// Append-only audit sink
///
/// Never fails the caller; implementations report their own storage
/// failures on a side channel.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Durable store for verification outcomes
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert one DMCA report; the id is assigned by the store
    async fn insert_dmca_report(
        &self,
        file_path: &str,
        uploader_id: &str,
        verdict: &InfringementVerdict,
    ) -> Result<DmcaReport>;

    /// Insert one consent log; the id is assigned by the store
    async fn insert_consent_log(
        &self,
        document_path: &str,
        subject_id: &str,
        verdict: &ConsentVerdict,
    ) -> Result<ConsentLog>;

    /// Most recent DMCA reports, newest first
    async fn recent_dmca_reports(&self, limit: u32) -> Result<Vec<DmcaReport>>;

    /// Most recent consent logs, newest first
    async fn recent_consent_logs(&self, limit: u32) -> Result<Vec<ConsentLog>>;
}

/// A persisted source of reviewable flags
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FlagSourceReader: Send + Sync {
    /// Which source this reader serves
    fn source(&self) -> FlagSource;

    /// Up to `window` most recent records with id greater than `after_id`,
    /// returned oldest first
    async fn read_recent(&self, window: u32, after_id: i64) -> Result<Vec<FlagRecord>>;
}

/// Durable, append-only escalation queue
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EscalationStore: Send + Sync {
    /// Last escalated record id per source
    async fn high_water_marks(&self) -> Result<HashMap<FlagSource, i64>>;

    /// Append entries and advance marks in one all-or-nothing write
    ///
    /// Entries whose source record is already escalated are skipped; the
    /// returned entries are the ones actually stored.
    async fn append(&self, entries: &[EscalationEntry], marks: &[(FlagSource, i64)])
        -> Result<Vec<EscalationEntry>>;

    /// Total number of stored escalations
    async fn count(&self) -> Result<u64>;
}
