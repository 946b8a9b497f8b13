//! Priority rules for escalated flags

use serde_json::{Map, Value};

use crate::domain::{FlagSource, Priority};

/// Absolute sentiment polarity above which a record is high priority
pub const EXTREME_POLARITY: f64 = 0.85;

/// Keywords that make a chat flag critical when no others are configured
pub const DEFAULT_VIOLENCE_KEYWORDS: [&str; 1] = ["violence"];

/// Assign a review priority to a record from `source`
///
/// `keywords` are expected lowercase; chat details are lowercased before
/// matching.
pub fn assign_priority(source: FlagSource, fields: &Map<String, Value>, keywords: &[String]) -> Priority {
    match source {
        FlagSource::Sentiment => {
            let polarity = fields.get("polarity").and_then(Value::as_f64).unwrap_or(0.0);
            if polarity.abs() > EXTREME_POLARITY {
                Priority::High
            } else {
                Priority::Normal
            }
        }
        FlagSource::Dmca => Priority::High,
        FlagSource::Consent => Priority::Critical,
        FlagSource::Chat => {
            let details = fields
                .get("details")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();
            if keywords.iter().any(|k| !k.is_empty() && details.contains(k.as_str())) {
                Priority::Critical
            } else {
                Priority::Normal
            }
        }
    }
}

/// Default keyword list as owned strings
pub fn default_keywords() -> Vec<String> {
    DEFAULT_VIOLENCE_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
