//! Audit events
//!
//! Append-only records of compliance decisions:
//! - DMCA violations and degraded DMCA checks
//! - Consent validation outcomes
//! - Flag escalations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    DmcaViolationDetected,
    DmcaCheckDegraded,
    ConsentValidationPassed,
    ConsentValidationFailed,
    FlagEscalated,

    // Other
    Custom(String),
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditEventKind::DmcaViolationDetected => write!(f, "dmca_violation_detected"),
            AuditEventKind::DmcaCheckDegraded => write!(f, "dmca_check_degraded"),
            AuditEventKind::ConsentValidationPassed => write!(f, "consent_validation_passed"),
            AuditEventKind::ConsentValidationFailed => write!(f, "consent_validation_failed"),
            AuditEventKind::FlagEscalated => write!(f, "flag_escalated"),
            AuditEventKind::Custom(s) => write!(f, "{}", s),
        }
    }
}

impl AuditEventKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "dmca_violation_detected" => AuditEventKind::DmcaViolationDetected,
            "dmca_check_degraded" => AuditEventKind::DmcaCheckDegraded,
            "consent_validation_passed" => AuditEventKind::ConsentValidationPassed,
            "consent_validation_failed" => AuditEventKind::ConsentValidationFailed,
            "flag_escalated" => AuditEventKind::FlagEscalated,
            other => AuditEventKind::Custom(other.to_string()),
        }
    }
}

/// A single audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_name: AuditEventKind,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_name: AuditEventKind, payload: serde_json::Value) -> Self {
        Self {
            event_name,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// An audit record read back from storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAuditEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: AuditEvent,
}
