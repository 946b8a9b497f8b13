//! Flag sources, escalation priorities and flag producer records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A producer of reviewable flags
///
/// Adding a producer means adding a variant here; the priority table in
/// `escalation::rules` then fails to compile until it handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    Sentiment,
    Dmca,
    Consent,
    Chat,
}

impl FlagSource {
    /// Default scan order of the aggregator
    pub const ALL: [FlagSource; 4] = [
        FlagSource::Sentiment,
        FlagSource::Dmca,
        FlagSource::Consent,
        FlagSource::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagSource::Sentiment => "sentiment",
            FlagSource::Dmca => "dmca",
            FlagSource::Consent => "consent",
            FlagSource::Chat => "chat",
        }
    }
}

impl fmt::Display for FlagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentiment" => Ok(FlagSource::Sentiment),
            "dmca" => Ok(FlagSource::Dmca),
            "consent" => Ok(FlagSource::Consent),
            "chat" => Ok(FlagSource::Chat),
            other => Err(format!("unknown flag source: {}", other)),
        }
    }
}

/// Review priority of an escalated flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// A record read from a flag source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRecord {
    /// Source-local auto-increment id, used as the high-water mark
    pub id: i64,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A flag promoted into the review queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEntry {
    pub source: FlagSource,
    pub source_record_id: i64,
    /// Passthrough of the source record
    pub original_fields: serde_json::Map<String, serde_json::Value>,
    pub priority: Priority,
    pub escalated_at: DateTime<Utc>,
}

const POSITIVE_THRESHOLD: f64 = 0.3;
const NEGATIVE_THRESHOLD: f64 = -0.3;
const NEUTRAL_MARGIN: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentClass {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentClass {
    pub fn classify(polarity: f64) -> Self {
        if polarity >= POSITIVE_THRESHOLD {
            SentimentClass::Positive
        } else if polarity <= NEGATIVE_THRESHOLD {
            SentimentClass::Negative
        } else if polarity.abs() < NEUTRAL_MARGIN {
            SentimentClass::Neutral
        } else {
            SentimentClass::Mixed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentClass::Positive => "positive",
            SentimentClass::Negative => "negative",
            SentimentClass::Neutral => "neutral",
            SentimentClass::Mixed => "mixed",
        }
    }
}

/// Sentiment score of one message, as logged by the sentiment monitor
///
/// Polarity and subjectivity come from an external model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub polarity: f64,
    pub subjectivity: f64,
    pub classification: SentimentClass,
    pub timestamp: DateTime<Utc>,
}

impl SentimentRecord {
    pub fn from_scores(polarity: f64, subjectivity: f64) -> Self {
        Self {
            polarity,
            subjectivity,
            classification: SentimentClass::classify(polarity),
            timestamp: Utc::now(),
        }
    }
}

/// A chat message flagged by moderation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFlag {
    pub message_id: String,
    pub user_id: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatFlag {
    pub fn new(
        message_id: impl Into<String>,
        user_id: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            user_id: user_id.into(),
            details: details.into(),
            timestamp: Utc::now(),
        }
    }
}
