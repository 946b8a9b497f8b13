//! Escalation aggregator
//!
//! Scans registered flag sources, tags and prioritizes new records, then
//! commits the entries together with per-source high-water marks.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::rules::{assign_priority, default_keywords};
use crate::domain::{AuditEvent, AuditEventKind, EscalationEntry, FlagSource};
use crate::infra::{AuditSink, ComplianceError, EscalationStore, FlagSourceReader, Result};

pub struct EscalationAggregator {
    /// Sources in scan order
    sources: Vec<Arc<dyn FlagSourceReader>>,
    store: Arc<dyn EscalationStore>,
    audit: Arc<dyn AuditSink>,
    /// Lowercased chat keywords that mark a flag critical
    keywords: Vec<String>,
    /// Held across the read + append cycle
    run_lock: Mutex<()>,
}

impl EscalationAggregator {
    pub fn new(
        sources: Vec<Arc<dyn FlagSourceReader>>,
        store: Arc<dyn EscalationStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            sources,
            store,
            audit,
            keywords: default_keywords(),
            run_lock: Mutex::new(()),
        }
    }

    /// Replace the violence keyword list
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Registered sources in scan order
    pub fn source_order(&self) -> Vec<FlagSource> {
        self.sources.iter().map(|s| s.source()).collect()
    }

    /// Escalate up to `window` new records per source
    ///
    /// Returns the entries committed by this run, in source order then
    /// record order. Records stored meanwhile by another aggregator on the
    /// same database are left out. Nothing is persisted if any read or the
    /// append fails.
    #[instrument(skip(self))]
    pub async fn escalate(&self, window: u32) -> Result<Vec<EscalationEntry>> {
        if window == 0 {
            return Err(ComplianceError::Configuration(
                "escalation window must be positive".to_string(),
            ));
        }

        let _guard = self.run_lock.lock().await;

        let marks = self.store.high_water_marks().await?;
        let escalated_at = Utc::now();
        let mut entries = Vec::new();
        let mut advanced = Vec::new();

        for reader in &self.sources {
            let source = reader.source();
            let after_id = marks.get(&source).copied().unwrap_or(0);
            let records = reader.read_recent(window, after_id).await?;

            if records.is_empty() {
                debug!(%source, after_id, "No new flags");
                continue;
            }

            let mut last_id = after_id;
            for record in records {
                last_id = last_id.max(record.id);
                let priority = assign_priority(source, &record.fields, &self.keywords);
                entries.push(EscalationEntry {
                    source,
                    source_record_id: record.id,
                    original_fields: record.fields,
                    priority,
                    escalated_at,
                });
            }
            advanced.push((source, last_id));
        }

        if entries.is_empty() {
            return Ok(entries);
        }

        let produced = entries.len();
        let stored = self.store.append(&entries, &advanced).await?;

        for entry in &stored {
            self.audit
                .record(AuditEvent::new(AuditEventKind::FlagEscalated, audit_payload(entry)))
                .await;
        }

        if stored.len() < produced {
            debug!(
                skipped = produced - stored.len(),
                "Records already escalated by another run"
            );
        }
        info!(escalated = stored.len(), "Escalation run committed");
        Ok(stored)
    }
}

/// The full entry, including the source record's fields
fn audit_payload(entry: &EscalationEntry) -> Value {
    match serde_json::to_value(entry) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Escalation entry not serializable; auditing its key only");
            json!({
                "source": entry.source.as_str(),
                "source_record_id": entry.source_record_id,
                "priority": entry.priority.as_str(),
                "escalated_at": entry.escalated_at.to_rfc3339(),
            })
        }
    }
}
