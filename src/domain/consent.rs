//! Consent document model: required fields, metadata extraction, vault records

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Minimum extracted text length before a document is considered readable
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 100;

/// Labels every release form must contain, matched case-insensitively
pub const REQUIRED_FIELDS: [&str; 5] = [
    "Full Legal Name",
    "Date of Birth",
    "Signature",
    "Date",
    "Grant of Consent",
];

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Full Legal Name[:\s]+([A-Z][a-z]+\s[A-Z][a-z]+)").expect("static regex")
});

static DOB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Date of Birth[:\s]+(\d{2}/\d{2}/\d{4})").expect("static regex")
});

static SIGNATURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Signature[:\s]+([A-Z][a-z]+\s[A-Z][a-z]+)").expect("static regex")
});

/// Required field labels absent from `text`, in declaration order
pub fn missing_required_fields(text: &str) -> Vec<&'static str> {
    let haystack = text.to_lowercase();
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !haystack.contains(&field.to_lowercase()))
        .collect()
}

/// Metadata pulled out of a consent form's text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormMetadata {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub signature_name: Option<String>,
}

impl FormMetadata {
    /// Extract name, date of birth and signature name from free text
    pub fn extract(text: &str) -> Self {
        Self {
            name: capture(&NAME_PATTERN, text),
            date_of_birth: capture(&DOB_PATTERN, text),
            signature_name: capture(&SIGNATURE_PATTERN, text),
        }
    }

    /// True when every field was found and is non-empty
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.date_of_birth, &self.signature_name]
            .iter()
            .all(|f| f.as_deref().is_some_and(|v| !v.is_empty()))
    }

    /// JSON object view used for comparison against vault attributes
    pub fn to_attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (key, value) in [
            ("name", &self.name),
            ("date_of_birth", &self.date_of_birth),
            ("signature_name", &self.signature_name),
        ] {
            let v = value
                .as_ref()
                .map(|s| serde_json::Value::String(s.clone()))
                .unwrap_or(serde_json::Value::Null);
            map.insert(key.to_string(), v);
        }
        map
    }
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Release record held by the secure vault for a subject
///
/// `attributes` is opaque to the verifier; only a `MetadataMatcher`
/// interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultRecord {
    pub subject_id: String,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl VaultRecord {
    pub fn new(
        subject_id: impl Into<String>,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            attributes,
        }
    }

    /// Build a record whose attributes mirror the given form metadata
    pub fn from_metadata(subject_id: impl Into<String>, metadata: &FormMetadata) -> Self {
        Self::new(subject_id, metadata.to_attributes())
    }
}
