//! Baseline collaborator implementations
//!
//! Stand-ins that let the pipeline run end to end without the real
//! watermark, reverse-search and OCR services. The SQLite registry and
//! vault live in [`sqlite`](super::sqlite).

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{FormMetadata, VaultRecord};
use crate::infra::{
    ComplianceError, MetadataMatcher, Result, ReverseSearch, ReverseSearchFinding, TextExtractor,
    WatermarkDetector, WatermarkFinding,
};

/// Watermark detector that never reports a violation
#[derive(Debug, Clone, Default)]
pub struct NoopWatermarkDetector;

#[async_trait]
impl WatermarkDetector for NoopWatermarkDetector {
    async fn detect_watermark(&self, _file_path: &Path) -> Result<WatermarkFinding> {
        Ok(WatermarkFinding::default())
    }
}

/// Reverse search that never finds a match
#[derive(Debug, Clone, Default)]
pub struct NoopReverseSearch;

#[async_trait]
impl ReverseSearch for NoopReverseSearch {
    async fn reverse_content_search(&self, _file_path: &Path) -> Result<ReverseSearchFinding> {
        Ok(ReverseSearchFinding::default())
    }
}

/// Reads documents that are already plain UTF-8 text
///
/// Binary input (scans, PDFs) is rejected; plug in a real OCR extractor for
/// those.
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, file_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(file_path).await?;
        String::from_utf8(bytes).map_err(|_| {
            ComplianceError::collaborator(
                "text_extractor",
                format!("{} is not a plain-text document", file_path.display()),
            )
        })
    }
}

/// Exact equality between extracted metadata and the vault attributes
#[derive(Debug, Clone, Default)]
pub struct ExactMetadataMatcher;

impl MetadataMatcher for ExactMetadataMatcher {
    fn match_metadata(&self, extracted: &FormMetadata, vault_record: &VaultRecord) -> bool {
        extracted.to_attributes() == vault_record.attributes
    }
}
