//! Verifiers for uploaded content
//!
//! - [`DmcaVerifier`] runs the infringement cascade and **fails open**:
//!   an internal error yields "no violation" so uploads proceed.
//! - [`ConsentVerifier`] runs the release-form pipeline and **fails
//!   closed**: an internal error yields "invalid" so content is blocked.

mod consent;
mod dmca;

pub use consent::ConsentVerifier;
pub use dmca::DmcaVerifier;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::DEFAULT_MIN_TEXT_LENGTH;
use crate::infra::{
    AuditSink, HashRegistry, MetadataMatcher, ReverseSearch, TextExtractor, Vault,
    WatermarkDetector, DEFAULT_COLLABORATOR_TIMEOUT,
};

/// The external capabilities the verifiers call, injected explicitly
#[derive(Clone)]
pub struct Collaborators {
    pub hash_registry: Arc<dyn HashRegistry>,
    pub watermark_detector: Arc<dyn WatermarkDetector>,
    pub reverse_search: Arc<dyn ReverseSearch>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub metadata_matcher: Arc<dyn MetadataMatcher>,
    pub vault: Arc<dyn Vault>,
    pub audit: Arc<dyn AuditSink>,
}

/// Tunables shared by both verifiers
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Time limit for each collaborator call
    pub collaborator_timeout: Duration,
    /// Minimum extracted text length for a consent document
    pub min_text_length: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
        }
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
