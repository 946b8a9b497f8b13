//! Integration tests for the DMCA verifier
//!
//! Covers the detection cascade order, fail-open behaviour and report
//! persistence through the compliance service.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use content_compliance::crypto::sha256_hex;
use content_compliance::domain::{AuditEventKind, DetectionMethod};
use content_compliance::{ComplianceService, Config, DmcaVerifier, VerifierConfig};

use common::*;

fn verifier(fakes: &Fakes) -> DmcaVerifier {
    DmcaVerifier::new(&fakes.collaborators(), &VerifierConfig::default())
}

#[tokio::test]
async fn test_missing_file_calls_no_collaborator() {
    let fakes = Fakes::new();

    let verdict = verifier(&fakes)
        .check(Path::new("/definitely/not/here.mp4"), "uploader-1")
        .await;

    assert!(!verdict.violation);
    assert_eq!(verdict.method, DetectionMethod::None);
    assert_eq!(verdict.details, "file does not exist");
    assert!(verdict.content_hash.is_empty());
    assert_eq!(fakes.registry.call_count(), 0);
    assert_eq!(fakes.watermark.call_count(), 0);
    assert_eq!(fakes.reverse.call_count(), 0);
    assert!(fakes.audit.events().is_empty());
}

#[tokio::test]
async fn test_hash_hit_short_circuits_cascade() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "clip.mp4", b"known pirated release");
    let fakes = Fakes::new();
    fakes.registry.insert(&sha256_hex(b"known pirated release"));
    fakes.watermark.set_finding(true, "should never be consulted");

    let verdict = verifier(&fakes).check(&path, "uploader-1").await;

    assert!(verdict.violation);
    assert_eq!(verdict.method, DetectionMethod::Hash);
    assert_eq!(verdict.content_hash, sha256_hex(b"known pirated release"));
    assert_eq!(fakes.watermark.call_count(), 0);
    assert_eq!(fakes.reverse.call_count(), 0);

    let events = fakes.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name, AuditEventKind::DmcaViolationDetected);
    assert_eq!(events[0].payload["uploader_id"], "uploader-1");
    assert_eq!(events[0].payload["hash"], verdict.content_hash.as_str());
}

#[tokio::test]
async fn test_reverse_search_is_last_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "clip.mp4", b"reuploaded stream");
    let fakes = Fakes::new();
    fakes.reverse.set_finding(true, "");

    let verdict = verifier(&fakes).check(&path, "uploader-1").await;

    assert!(verdict.violation);
    assert_eq!(verdict.method, DetectionMethod::ReverseSearch);
    assert_eq!(verdict.details, "match found in reverse content index");
    assert_eq!(fakes.registry.call_count(), 1);
    assert_eq!(fakes.watermark.call_count(), 1);
    assert_eq!(fakes.reverse.call_count(), 1);
}

#[tokio::test]
async fn test_watermark_timeout_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "clip.mp4", b"slow to scan");
    let fakes = Fakes::new();
    fakes.watermark.set_finding(true, "never returned in time");
    fakes.watermark.set_delay(Duration::from_secs(5));

    let config = VerifierConfig {
        collaborator_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let verdict = DmcaVerifier::new(&fakes.collaborators(), &config)
        .check(&path, "uploader-1")
        .await;

    assert!(!verdict.violation);
    assert!(verdict.details.starts_with("dmca check error:"));
    assert!(verdict.details.contains("watermark_detector timed out"));
    assert_eq!(verdict.content_hash, sha256_hex(b"slow to scan"));
    assert_eq!(fakes.reverse.call_count(), 0);

    let events = fakes.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name, AuditEventKind::DmcaCheckDegraded);
    assert_eq!(events[0].payload["hash"], verdict.content_hash.as_str());
    assert_eq!(events[0].payload["error"], verdict.details.as_str());
}

#[tokio::test]
async fn test_registry_failure_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "clip.mp4", b"anything");
    let fakes = Fakes::new();
    fakes.registry.fail_with("registry unavailable");

    let verdict = verifier(&fakes).check(&path, "uploader-1").await;

    assert!(!verdict.violation);
    assert!(verdict.details.contains("registry unavailable"));
    assert_eq!(fakes.watermark.call_count(), 0);
    assert_eq!(fakes.audit.count_of(&AuditEventKind::DmcaCheckDegraded), 1);
    assert_eq!(fakes.audit.count_of(&AuditEventKind::DmcaViolationDetected), 0);
}

#[tokio::test]
async fn test_repeated_checks_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "clip.mp4", b"watermarked master");
    let fakes = Fakes::new();
    fakes.watermark.set_finding(true, "studio watermark id 42");
    let verifier = verifier(&fakes);

    let first = verifier.check(&path, "uploader-1").await;
    let second = verifier.check(&path, "uploader-1").await;

    assert!(first.same_outcome(&second));
    assert_eq!(first.method, DetectionMethod::Watermark);
    assert_eq!(first.details, "studio watermark id 42");
    assert_eq!(fakes.audit.count_of(&AuditEventKind::DmcaViolationDetected), 2);
}

#[tokio::test]
async fn test_concurrent_checks_store_one_report_each() {
    let dir = tempfile::tempdir().unwrap();
    let pool = file_pool(dir.path()).await;
    let service = Arc::new(ComplianceService::sqlite(pool, &Config::default()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let path = write_file(dir.path(), &format!("upload-{i}.bin"), format!("payload {i}"));
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.check_dmca(&path, &format!("uploader-{i}")).await
        }));
    }

    for handle in handles {
        let verdict = handle.await.unwrap().unwrap();
        assert!(!verdict.violation);
        assert_eq!(verdict.details, "no violation detected");
    }

    let reports = service.recent_dmca_reports(100).await.unwrap();
    assert_eq!(reports.len(), 8);

    let mut ids: Vec<i64> = reports.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    let mut uploaders: Vec<&str> = reports.iter().map(|r| r.uploader_id.as_str()).collect();
    uploaders.sort_unstable();
    uploaders.dedup();
    assert_eq!(uploaders.len(), 8);
}

#[tokio::test]
async fn test_reports_listed_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let service = ComplianceService::sqlite(memory_pool().await, &Config::default());

    for name in ["a.bin", "b.bin", "c.bin"] {
        let path = write_file(dir.path(), name, name);
        service.check_dmca(&path, "uploader-1").await.unwrap();
    }

    let reports = service.recent_dmca_reports(2).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports[0].id > reports[1].id);
    assert!(reports[0].file_path.ends_with("c.bin"));
}
