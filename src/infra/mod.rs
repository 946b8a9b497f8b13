//! Infrastructure layer for the compliance pipeline
//!
//! Contains trait definitions and implementations for:
//! - Collaborator seams (hash registry, watermark, reverse search, OCR, vault)
//! - Report and escalation storage (SQLite)
//! - Audit logging (append-only)
//! - Collaborator time limits

mod adapters;
mod audit;
mod error;
pub mod sqlite;
mod timeout;
mod traits;

pub use adapters::{ExactMetadataMatcher, NoopReverseSearch, NoopWatermarkDetector, PlainTextExtractor};
pub use audit::{AuditQueryFilters, SqliteAuditLog};
pub use error::*;
pub use sqlite::{
    ConsentFailureFlags, DmcaViolationFlags, SqliteChatFlags, SqliteEscalationStore,
    SqliteHashRegistry, SqliteReportStore, SqliteSentimentLog, SqliteVault,
};
pub use timeout::{bounded, DEFAULT_COLLABORATOR_TIMEOUT};
pub use traits::*;
