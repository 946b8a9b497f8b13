//! DMCA infringement check
//!
//! Cascade, stopping at the first hit:
//! 1. SHA-256 of the file, looked up in the known-infringement registry
//! 2. Watermark detection
//! 3. Reverse content search
//!
//! The digest is recorded on every verdict once the file has been read.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{is_regular_file, Collaborators, VerifierConfig};
use crate::crypto::hash_file;
use crate::domain::{AuditEvent, AuditEventKind, DetectionMethod, InfringementVerdict};
use crate::infra::{bounded, AuditSink, HashRegistry, Result, ReverseSearch, WatermarkDetector};

/// Stage order of the cascade
const CASCADE: [DetectionMethod; 3] = [
    DetectionMethod::Hash,
    DetectionMethod::Watermark,
    DetectionMethod::ReverseSearch,
];

pub struct DmcaVerifier {
    hash_registry: Arc<dyn HashRegistry>,
    watermark_detector: Arc<dyn WatermarkDetector>,
    reverse_search: Arc<dyn ReverseSearch>,
    audit: Arc<dyn AuditSink>,
    timeout: Duration,
}

impl DmcaVerifier {
    pub fn new(collaborators: &Collaborators, config: &VerifierConfig) -> Self {
        Self {
            hash_registry: collaborators.hash_registry.clone(),
            watermark_detector: collaborators.watermark_detector.clone(),
            reverse_search: collaborators.reverse_search.clone(),
            audit: collaborators.audit.clone(),
            timeout: config.collaborator_timeout,
        }
    }

    /// Check an uploaded file for infringement
    ///
    /// Never fails: collaborator errors and timeouts produce a
    /// non-violating verdict carrying the error text.
    #[instrument(skip(self, file_path), fields(file_path = %file_path.display()))]
    pub async fn check(&self, file_path: &Path, uploader_id: &str) -> InfringementVerdict {
        let timestamp = Utc::now();

        if !is_regular_file(file_path).await {
            info!("DMCA check skipped: file does not exist");
            return InfringementVerdict::file_missing(timestamp);
        }

        let content_hash = match hash_file(file_path).await {
            Ok(digest) => digest,
            Err(e) => {
                warn!(error = %e, "DMCA check could not read file; failing open");
                let verdict = InfringementVerdict::errored(String::new(), e, timestamp);
                self.record_degraded(file_path, uploader_id, &verdict).await;
                return verdict;
            }
        };

        let verdict = match self.run_cascade(file_path, &content_hash).await {
            Ok(Some((method, details))) => {
                InfringementVerdict::infringing(method, details, content_hash, timestamp)
            }
            Ok(None) => InfringementVerdict::clean(content_hash, timestamp),
            Err(e) => {
                warn!(error = %e, "DMCA check failed; failing open");
                let verdict = InfringementVerdict::errored(content_hash, e, timestamp);
                self.record_degraded(file_path, uploader_id, &verdict).await;
                return verdict;
            }
        };

        if verdict.violation {
            warn!(
                uploader_id,
                method = %verdict.method,
                content_hash = %verdict.content_hash,
                "DMCA violation detected"
            );
            self.audit
                .record(AuditEvent::new(
                    AuditEventKind::DmcaViolationDetected,
                    json!({
                        "uploader_id": uploader_id,
                        "file_path": file_path.display().to_string(),
                        "hash": verdict.content_hash,
                        "method": verdict.method,
                        "details": verdict.details,
                        "timestamp": verdict.timestamp.to_rfc3339(),
                    }),
                ))
                .await;
        } else {
            info!(content_hash = %verdict.content_hash, "No DMCA violation detected");
        }

        verdict
    }

    /// Audit a check that failed open; the verdict itself stays non-violating
    async fn record_degraded(&self, file_path: &Path, uploader_id: &str, verdict: &InfringementVerdict) {
        self.audit
            .record(AuditEvent::new(
                AuditEventKind::DmcaCheckDegraded,
                json!({
                    "uploader_id": uploader_id,
                    "file_path": file_path.display().to_string(),
                    "hash": verdict.content_hash,
                    "error": verdict.details,
                    "timestamp": verdict.timestamp.to_rfc3339(),
                }),
            ))
            .await;
    }

    async fn run_cascade(
        &self,
        file_path: &Path,
        content_hash: &str,
    ) -> Result<Option<(DetectionMethod, String)>> {
        for stage in CASCADE {
            if let Some(details) = self.run_stage(stage, file_path, content_hash).await? {
                return Ok(Some((stage, details)));
            }
        }
        Ok(None)
    }

    /// Run one stage; `Some(details)` on a hit
    async fn run_stage(
        &self,
        stage: DetectionMethod,
        file_path: &Path,
        content_hash: &str,
    ) -> Result<Option<String>> {
        match stage {
            DetectionMethod::Hash => {
                let known = bounded(
                    "hash_registry",
                    self.timeout,
                    self.hash_registry.lookup_known_hash(content_hash),
                )
                .await?;
                Ok(known.then(|| "match found in known infringement hash registry".to_string()))
            }
            DetectionMethod::Watermark => {
                let finding = bounded(
                    "watermark_detector",
                    self.timeout,
                    self.watermark_detector.detect_watermark(file_path),
                )
                .await?;
                Ok(finding
                    .violation
                    .then(|| or_default(finding.details, "infringing watermark detected")))
            }
            DetectionMethod::ReverseSearch => {
                let finding = bounded(
                    "reverse_search",
                    self.timeout,
                    self.reverse_search.reverse_content_search(file_path),
                )
                .await?;
                Ok(finding
                    .match_found
                    .then(|| or_default(finding.details, "match found in reverse content index")))
            }
            DetectionMethod::None => Ok(None),
        }
    }
}

fn or_default(details: String, default: &str) -> String {
    if details.trim().is_empty() {
        default.to_string()
    } else {
        details
    }
}
