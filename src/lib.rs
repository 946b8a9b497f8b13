//! Content Compliance Library
//!
//! Verification pipeline for uploaded media: DMCA infringement checks,
//! consent / model-release validation, flag escalation and an append-only
//! audit trail.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (verdicts, flags, audit events)
//! - [`verify`] - DMCA and consent verifiers
//! - [`escalation`] - Flag aggregation and priority rules
//! - [`infra`] - Collaborator traits, SQLite stores, audit log
//! - [`crypto`] - Content hashing
//! - [`service`] - Verifiers wired to persistence
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Logging setup

pub mod config;
pub mod crypto;
pub mod domain;
pub mod escalation;
pub mod infra;
pub mod migrations;
pub mod service;
pub mod telemetry;
pub mod verify;

// Re-export commonly used types
pub use config::Config;
pub use domain::{
    AuditEvent, AuditEventKind, ConsentLog, ConsentVerdict, DetectionMethod, DmcaReport,
    EscalationEntry, FlagRecord, FlagSource, InfringementVerdict, Priority,
};
pub use escalation::EscalationAggregator;
pub use infra::{ComplianceError, Result};
pub use service::ComplianceService;
pub use verify::{Collaborators, ConsentVerifier, DmcaVerifier, VerifierConfig};
