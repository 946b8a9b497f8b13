//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;

use content_compliance::domain::{AuditEvent, AuditEventKind, FormMetadata, VaultRecord};
use content_compliance::infra::{
    sqlite, AuditSink, ComplianceError, ExactMetadataMatcher, HashRegistry, PlainTextExtractor,
    Result, ReverseSearch, ReverseSearchFinding, Vault, WatermarkDetector, WatermarkFinding,
};
use content_compliance::Collaborators;

/// Fresh in-memory database with migrations applied
pub async fn memory_pool() -> SqlitePool {
    let pool = sqlite::connect_in_memory().await.unwrap();
    sqlite::initialize(&pool).await.unwrap();
    pool
}

/// File-backed database under `dir`, for tests that need several connections
pub async fn file_pool(dir: &Path) -> SqlitePool {
    let url = format!("sqlite://{}?mode=rwc", dir.join("compliance.db").display());
    let pool = sqlite::connect(&url, 5).await.unwrap();
    sqlite::initialize(&pool).await.unwrap();
    pool
}

/// Write `contents` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// A complete release form for the given identity
pub fn release_form(name: &str, date_of_birth: &str, signature: &str) -> String {
    format!(
        "MODEL RELEASE AND CONSENT AGREEMENT\n\
         Full Legal Name: {name}\n\
         Date of Birth: {date_of_birth}\n\
         Grant of Consent: I grant the producer a perpetual, worldwide licence to \
         record, edit and publish the material described in schedule A.\n\
         Signature: {signature}\n\
         Date: 03/04/2024\n"
    )
}

/// Vault record matching what `release_form` extracts
pub fn vault_record_for(subject_id: &str, form: &str) -> VaultRecord {
    VaultRecord::from_metadata(subject_id, &FormMetadata::extract(form))
}

/// Hash registry backed by a fixed digest set
#[derive(Default)]
pub struct FakeHashRegistry {
    known: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
    fail: Mutex<Option<String>>,
}

impl FakeHashRegistry {
    pub fn insert(&self, digest: &str) {
        self.known.lock().unwrap().insert(digest.to_string());
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail.lock().unwrap() = Some(message.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HashRegistry for FakeHashRegistry {
    async fn lookup_known_hash(&self, hex_digest: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail.lock().unwrap().clone() {
            return Err(ComplianceError::collaborator("hash_registry", message));
        }
        Ok(self.known.lock().unwrap().contains(hex_digest))
    }
}

/// Watermark detector with a scripted answer and optional delay
#[derive(Default)]
pub struct FakeWatermarkDetector {
    finding: Mutex<WatermarkFinding>,
    delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
}

impl FakeWatermarkDetector {
    pub fn set_finding(&self, violation: bool, details: &str) {
        *self.finding.lock().unwrap() = WatermarkFinding {
            violation,
            details: details.to_string(),
        };
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatermarkDetector for FakeWatermarkDetector {
    async fn detect_watermark(&self, _file_path: &Path) -> Result<WatermarkFinding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.finding.lock().unwrap().clone())
    }
}

/// Reverse search with a scripted answer
#[derive(Default)]
pub struct FakeReverseSearch {
    finding: Mutex<ReverseSearchFinding>,
    pub calls: AtomicUsize,
}

impl FakeReverseSearch {
    pub fn set_finding(&self, match_found: bool, details: &str) {
        *self.finding.lock().unwrap() = ReverseSearchFinding {
            match_found,
            details: details.to_string(),
        };
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReverseSearch for FakeReverseSearch {
    async fn reverse_content_search(&self, _file_path: &Path) -> Result<ReverseSearchFinding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.finding.lock().unwrap().clone())
    }
}

/// Vault held in memory
#[derive(Default)]
pub struct MemoryVault {
    records: Mutex<HashMap<String, VaultRecord>>,
    pub calls: AtomicUsize,
}

impl MemoryVault {
    pub fn put(&self, record: VaultRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.subject_id.clone(), record);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Vault for MemoryVault {
    async fn fetch_vault_record(&self, subject_id: &str) -> Result<Option<VaultRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().get(subject_id).cloned())
    }
}

/// Audit sink that keeps every event
#[derive(Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_of(&self, kind: &AuditEventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.event_name == kind)
            .count()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Every fake, kept by concrete type so tests can inspect them
#[derive(Default)]
pub struct Fakes {
    pub registry: Arc<FakeHashRegistry>,
    pub watermark: Arc<FakeWatermarkDetector>,
    pub reverse: Arc<FakeReverseSearch>,
    pub vault: Arc<MemoryVault>,
    pub audit: Arc<RecordingAudit>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            hash_registry: self.registry.clone(),
            watermark_detector: self.watermark.clone(),
            reverse_search: self.reverse.clone(),
            text_extractor: Arc::new(PlainTextExtractor),
            metadata_matcher: Arc::new(ExactMetadataMatcher),
            vault: self.vault.clone(),
            audit: self.audit.clone(),
        }
    }
}
