//! Runtime configuration

use std::time::Duration;

use crate::domain::DEFAULT_MIN_TEXT_LENGTH;
use crate::escalation::default_keywords;
use crate::verify::VerifierConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite://compliance.db?mode=rwc";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL.
    pub database_url: String,
    /// Maximum database connections.
    pub max_connections: u32,
    /// Minimum extracted text length for consent documents.
    pub min_text_length: usize,
    /// Time limit for each collaborator call.
    pub collaborator_timeout: Duration,
    /// Default number of records scanned per source on an escalation run.
    pub escalation_window: u32,
    /// Lowercased chat keywords that mark a flag critical.
    pub violence_keywords: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            collaborator_timeout: Duration::from_millis(10_000),
            escalation_window: 10,
            violence_keywords: default_keywords(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults.database_url.clone());

        let max_connections: u32 = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.max_connections);

        let min_text_length: usize = std::env::var("CONSENT_MIN_TEXT_LENGTH")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.min_text_length);

        let collaborator_timeout = std::env::var("COLLABORATOR_TIMEOUT_MS")
            .ok()
            .and_then(|p| p.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.collaborator_timeout);

        let escalation_window: u32 = std::env::var("ESCALATION_WINDOW")
            .ok()
            .and_then(|p| p.parse().ok())
            .filter(|w| *w > 0)
            .unwrap_or(defaults.escalation_window);

        let violence_keywords = std::env::var("VIOLENCE_KEYWORDS")
            .ok()
            .map(|v| parse_keywords(&v))
            .filter(|k| !k.is_empty())
            .unwrap_or(defaults.violence_keywords);

        Self {
            database_url,
            max_connections,
            min_text_length,
            collaborator_timeout,
            escalation_window,
            violence_keywords,
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_min_text_length(mut self, length: usize) -> Self {
        self.min_text_length = length;
        self
    }

    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }

    pub fn with_escalation_window(mut self, window: u32) -> Self {
        self.escalation_window = window;
        self
    }

    pub fn with_violence_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.violence_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    /// Settings shared by both verifiers
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            collaborator_timeout: self.collaborator_timeout,
            min_text_length: self.min_text_length,
        }
    }
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
