//! Consent / model-release validation
//!
//! Each stage can end the pipeline with an invalid verdict:
//! document present, text extracted, required labels present, metadata
//! extracted, vault record present, metadata matches. Only a document that
//! passes every stage is hashed and marked valid.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{is_regular_file, Collaborators, VerifierConfig};
use crate::crypto::hash_file;
use crate::domain::{
    missing_required_fields, AuditEvent, AuditEventKind, ConsentVerdict, FormMetadata,
};
use crate::infra::{bounded, AuditSink, MetadataMatcher, Result, TextExtractor, Vault};

pub struct ConsentVerifier {
    text_extractor: Arc<dyn TextExtractor>,
    metadata_matcher: Arc<dyn MetadataMatcher>,
    vault: Arc<dyn Vault>,
    audit: Arc<dyn AuditSink>,
    timeout: Duration,
    min_text_length: usize,
}

impl ConsentVerifier {
    pub fn new(collaborators: &Collaborators, config: &VerifierConfig) -> Self {
        Self {
            text_extractor: collaborators.text_extractor.clone(),
            metadata_matcher: collaborators.metadata_matcher.clone(),
            vault: collaborators.vault.clone(),
            audit: collaborators.audit.clone(),
            timeout: config.collaborator_timeout,
            min_text_length: config.min_text_length,
        }
    }

    /// Validate a consent document for `subject_id`
    ///
    /// Never fails: any error becomes an invalid verdict and is audited as
    /// `consent_validation_failed`.
    #[instrument(skip(self, document_path), fields(document_path = %document_path.display()))]
    pub async fn validate(&self, document_path: &Path, subject_id: &str) -> ConsentVerdict {
        let timestamp = Utc::now();

        match self.run_pipeline(document_path, subject_id, timestamp).await {
            Ok(verdict) if verdict.valid => {
                info!(document_hash = %verdict.document_hash, "Consent document validated");
                self.audit
                    .record(AuditEvent::new(
                        AuditEventKind::ConsentValidationPassed,
                        json!({
                            "subject_id": subject_id,
                            "document_hash": verdict.document_hash,
                            "timestamp": timestamp.to_rfc3339(),
                        }),
                    ))
                    .await;
                verdict
            }
            Ok(verdict) => {
                info!(reason = %verdict.reason, "Consent document rejected");
                verdict
            }
            Err(e) => {
                warn!(error = %e, "Consent validation failed; failing closed");
                self.audit
                    .record(AuditEvent::new(
                        AuditEventKind::ConsentValidationFailed,
                        json!({
                            "subject_id": subject_id,
                            "error": e.to_string(),
                            "timestamp": timestamp.to_rfc3339(),
                        }),
                    ))
                    .await;
                ConsentVerdict::invalid(format!("validation error: {}", e), timestamp)
            }
        }
    }

    async fn run_pipeline(
        &self,
        document_path: &Path,
        subject_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<ConsentVerdict> {
        if !is_regular_file(document_path).await {
            return Ok(ConsentVerdict::invalid("document not found", timestamp));
        }

        let text = bounded(
            "text_extractor",
            self.timeout,
            self.text_extractor.extract_text(document_path),
        )
        .await?;

        if text.chars().count() < self.min_text_length {
            return Ok(ConsentVerdict::invalid(
                "extraction failed or content too short",
                timestamp,
            ));
        }

        let missing = missing_required_fields(&text);
        if !missing.is_empty() {
            return Ok(ConsentVerdict::invalid(
                format!("missing required fields: {}", missing.join(", ")),
                timestamp,
            ));
        }

        let metadata = FormMetadata::extract(&text);
        if !metadata.is_complete() {
            return Ok(ConsentVerdict::invalid("essential metadata missing", timestamp));
        }

        let record = bounded(
            "vault",
            self.timeout,
            self.vault.fetch_vault_record(subject_id),
        )
        .await?;

        let Some(record) = record else {
            return Ok(ConsentVerdict::invalid("no release record found", timestamp));
        };

        if !self.metadata_matcher.match_metadata(&metadata, &record) {
            return Ok(ConsentVerdict::invalid(
                "metadata mismatch with registered record",
                timestamp,
            ));
        }

        let document_hash = hash_file(document_path).await?;
        Ok(ConsentVerdict::validated(document_hash, timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256_hex;
    use crate::domain::VaultRecord;
    use crate::infra::{
        ComplianceError, ExactMetadataMatcher, MockAuditSink, MockHashRegistry,
        MockMetadataMatcher, MockReverseSearch, MockTextExtractor, MockVault,
        MockWatermarkDetector,
    };
    use std::path::PathBuf;
    use tempfile::TempDir;

    const FORM: &str = "MODEL RELEASE AND CONSENT AGREEMENT\n\
        Full Legal Name: Jane Doe\n\
        Date of Birth: 01/02/1990\n\
        Grant of Consent: I grant the producer a perpetual licence to publish \
        the recorded material.\n\
        Signature: Jane Doe\n\
        Date: 03/04/2024\n";

    fn document(text: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.txt");
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    fn record() -> VaultRecord {
        VaultRecord::from_metadata("model-1", &FormMetadata::extract(FORM))
    }

    fn verifier(
        extractor: MockTextExtractor,
        vault: MockVault,
        matcher: Arc<dyn MetadataMatcher>,
        audit: MockAuditSink,
    ) -> ConsentVerifier {
        let collaborators = Collaborators {
            hash_registry: Arc::new(MockHashRegistry::new()),
            watermark_detector: Arc::new(MockWatermarkDetector::new()),
            reverse_search: Arc::new(MockReverseSearch::new()),
            text_extractor: Arc::new(extractor),
            metadata_matcher: matcher,
            vault: Arc::new(vault),
            audit: Arc::new(audit),
        };
        ConsentVerifier::new(&collaborators, &VerifierConfig::default())
    }

    fn extractor_returning(text: &'static str) -> MockTextExtractor {
        let mut extractor = MockTextExtractor::new();
        extractor
            .expect_extract_text()
            .returning(move |_| Ok(text.to_string()));
        extractor
    }

    #[tokio::test]
    async fn test_missing_document() {
        let mut extractor = MockTextExtractor::new();
        extractor.expect_extract_text().never();
        let mut audit = MockAuditSink::new();
        audit.expect_record().never();

        let v = verifier(extractor, MockVault::new(), Arc::new(ExactMetadataMatcher), audit)
            .validate(Path::new("/no/release.pdf"), "model-1")
            .await;

        assert!(!v.valid);
        assert_eq!(v.reason, "document not found");
        assert!(v.document_hash.is_empty());
    }

    #[tokio::test]
    async fn test_short_text_rejected() {
        let (_dir, path) = document("x");
        let mut vault = MockVault::new();
        vault.expect_fetch_vault_record().never();

        let v = verifier(
            extractor_returning("Signature: Jane Doe"),
            vault,
            Arc::new(ExactMetadataMatcher),
            MockAuditSink::new(),
        )
        .validate(&path, "model-1")
        .await;

        assert_eq!(v.reason, "extraction failed or content too short");
    }

    #[tokio::test]
    async fn test_missing_fields_listed_verbatim() {
        let (_dir, path) = document("x");
        let text: &'static str = "MODEL RELEASE AND CONSENT AGREEMENT FOR PUBLICATION\n\
            Full Legal Name: Jane Doe\n\
            Grant of Consent: I grant the producer a perpetual licence to publish.\n";

        let v = verifier(
            extractor_returning(text),
            MockVault::new(),
            Arc::new(ExactMetadataMatcher),
            MockAuditSink::new(),
        )
        .validate(&path, "model-1")
        .await;

        assert!(!v.valid);
        assert!(v.reason.starts_with("missing required fields:"));
        assert!(v.reason.contains("Signature"));
        assert!(v.reason.contains("Date of Birth"));
        assert!(!v.reason.contains("Full Legal Name"));
    }

    #[tokio::test]
    async fn test_unparseable_metadata() {
        let (_dir, path) = document("x");
        let text: &'static str = "MODEL RELEASE AND CONSENT AGREEMENT\n\
            Full Legal Name: jane doe\n\
            Date of Birth: 01/02/1990\n\
            Grant of Consent: I grant the producer a perpetual licence to publish.\n\
            Signature: Jane Doe\n\
            Date: 03/04/2024\n";
        let mut vault = MockVault::new();
        vault.expect_fetch_vault_record().never();

        let v = verifier(
            extractor_returning(text),
            vault,
            Arc::new(ExactMetadataMatcher),
            MockAuditSink::new(),
        )
        .validate(&path, "model-1")
        .await;

        assert_eq!(v.reason, "essential metadata missing");
    }

    #[tokio::test]
    async fn test_no_vault_record() {
        let (_dir, path) = document(FORM);
        let mut vault = MockVault::new();
        vault
            .expect_fetch_vault_record()
            .withf(|id| id == "model-404")
            .times(1)
            .returning(|_| Ok(None));
        let mut matcher = MockMetadataMatcher::new();
        matcher.expect_match_metadata().never();

        let v = verifier(
            extractor_returning(FORM),
            vault,
            Arc::new(matcher),
            MockAuditSink::new(),
        )
        .validate(&path, "model-404")
        .await;

        assert_eq!(v.reason, "no release record found");
    }

    #[tokio::test]
    async fn test_valid_document_is_hashed_and_audited() {
        let (_dir, path) = document(FORM);
        let mut vault = MockVault::new();
        vault
            .expect_fetch_vault_record()
            .returning(|_| Ok(Some(record())));
        let mut audit = MockAuditSink::new();
        audit
            .expect_record()
            .withf(|e| {
                e.event_name == AuditEventKind::ConsentValidationPassed
                    && e.payload["subject_id"] == "model-1"
            })
            .times(1)
            .returning(|_| ());

        let v = verifier(
            extractor_returning(FORM),
            vault,
            Arc::new(ExactMetadataMatcher),
            audit,
        )
        .validate(&path, "model-1")
        .await;

        assert!(v.valid);
        assert_eq!(v.reason, "validated");
        assert_eq!(v.document_hash, sha256_hex(FORM.as_bytes()));
    }

    #[tokio::test]
    async fn test_metadata_mismatch() {
        let (_dir, path) = document(FORM);
        let mut vault = MockVault::new();
        vault.expect_fetch_vault_record().returning(|_| {
            let mut r = record();
            r.attributes
                .insert("date_of_birth".into(), serde_json::json!("09/09/1999"));
            Ok(Some(r))
        });
        let mut audit = MockAuditSink::new();
        audit.expect_record().never();

        let v = verifier(
            extractor_returning(FORM),
            vault,
            Arc::new(ExactMetadataMatcher),
            audit,
        )
        .validate(&path, "model-1")
        .await;

        assert!(!v.valid);
        assert!(v.reason.starts_with("metadata mismatch"));
        assert!(v.document_hash.is_empty());
    }

    #[tokio::test]
    async fn test_extractor_error_fails_closed() {
        let (_dir, path) = document(FORM);
        let mut extractor = MockTextExtractor::new();
        extractor
            .expect_extract_text()
            .returning(|_| Err(ComplianceError::collaborator("text_extractor", "ocr backend offline")));
        let mut audit = MockAuditSink::new();
        audit
            .expect_record()
            .withf(|e| {
                e.event_name == AuditEventKind::ConsentValidationFailed
                    && e.payload["error"]
                        .as_str()
                        .is_some_and(|s| s.contains("ocr backend offline"))
            })
            .times(1)
            .returning(|_| ());

        let v = verifier(extractor, MockVault::new(), Arc::new(ExactMetadataMatcher), audit)
            .validate(&path, "model-1")
            .await;

        assert!(!v.valid);
        assert!(v.reason.starts_with("validation error:"));
        assert!(v.reason.contains("ocr backend offline"));
    }

    #[tokio::test]
    async fn test_vault_error_fails_closed() {
        let (_dir, path) = document(FORM);
        let mut vault = MockVault::new();
        vault
            .expect_fetch_vault_record()
            .returning(|_| Err(ComplianceError::collaborator("vault", "sealed")));
        let mut audit = MockAuditSink::new();
        audit.expect_record().times(1).returning(|_| ());

        let v = verifier(
            extractor_returning(FORM),
            vault,
            Arc::new(ExactMetadataMatcher),
            audit,
        )
        .validate(&path, "model-1")
        .await;

        assert!(!v.valid);
        assert!(v.reason.contains("sealed"));
    }
}
