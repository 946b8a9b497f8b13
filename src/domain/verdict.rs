//! Verification verdicts and their persisted forms
//!
//! A verdict is produced once per verification pass and never revised.
//! `DmcaReport` and `ConsentLog` wrap a verdict with the request identity
//! and the auto-increment id assigned on insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which stage of the DMCA cascade produced a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// No stage matched (or the check could not run)
    None,
    /// Digest found in the known-infringement registry
    Hash,
    /// Infringing watermark detected
    Watermark,
    /// Reverse content search found a match
    ReverseSearch,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::None => "none",
            DetectionMethod::Hash => "hash",
            DetectionMethod::Watermark => "watermark",
            DetectionMethod::ReverseSearch => "reverse_search",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(DetectionMethod::None),
            "hash" => Ok(DetectionMethod::Hash),
            "watermark" => Ok(DetectionMethod::Watermark),
            "reverse_search" => Ok(DetectionMethod::ReverseSearch),
            other => Err(format!("unknown detection method: {}", other)),
        }
    }
}

/// Outcome of a DMCA check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfringementVerdict {
    pub violation: bool,
    pub method: DetectionMethod,
    pub details: String,
    /// Lowercase hex SHA-256 of the file; empty when the file was not read
    pub content_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl InfringementVerdict {
    pub fn file_missing(timestamp: DateTime<Utc>) -> Self {
        Self {
            violation: false,
            method: DetectionMethod::None,
            details: "file does not exist".to_string(),
            content_hash: String::new(),
            timestamp,
        }
    }

    pub fn clean(content_hash: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            violation: false,
            method: DetectionMethod::None,
            details: "no violation detected".to_string(),
            content_hash,
            timestamp,
        }
    }

    pub fn infringing(
        method: DetectionMethod,
        details: impl Into<String>,
        content_hash: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            violation: true,
            method,
            details: details.into(),
            content_hash,
            timestamp,
        }
    }

    /// Fail-open verdict: an internal error never blocks the upload
    pub fn errored(content_hash: String, error: impl fmt::Display, timestamp: DateTime<Utc>) -> Self {
        Self {
            violation: false,
            method: DetectionMethod::None,
            details: format!("dmca check error: {}", error),
            content_hash,
            timestamp,
        }
    }

    /// Compare everything except the timestamp
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.violation == other.violation
            && self.method == other.method
            && self.details == other.details
            && self.content_hash == other.content_hash
    }
}

/// Outcome of a consent document validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentVerdict {
    pub valid: bool,
    pub reason: String,
    /// Lowercase hex SHA-256 of the document; set only on success
    pub document_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl ConsentVerdict {
    pub fn invalid(reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
            document_hash: String::new(),
            timestamp,
        }
    }

    pub fn validated(document_hash: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            valid: true,
            reason: "validated".to_string(),
            document_hash,
            timestamp,
        }
    }

    /// Compare everything except the timestamp
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.valid == other.valid
            && self.reason == other.reason
            && self.document_hash == other.document_hash
    }
}

/// Persisted DMCA check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmcaReport {
    pub id: i64,
    pub file_path: String,
    pub uploader_id: String,
    #[serde(flatten)]
    pub verdict: InfringementVerdict,
}

/// Persisted consent validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentLog {
    pub id: i64,
    pub document_path: String,
    pub subject_id: String,
    #[serde(flatten)]
    pub verdict: ConsentVerdict,
}
