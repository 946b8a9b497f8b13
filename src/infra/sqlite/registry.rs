//! SQLite-backed hash registry and release-record vault

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;

use super::parse_object;
use crate::crypto::is_sha256_hex;
use crate::domain::VaultRecord;
use crate::infra::{ComplianceError, HashRegistry, Result, Vault};

/// Known-infringement digest registry
#[derive(Clone)]
pub struct SqliteHashRegistry {
    pool: SqlitePool,
}

impl SqliteHashRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a digest of known infringing content
    pub async fn register_hash(&self, hex_digest: &str, label: Option<&str>) -> Result<()> {
        let digest = hex_digest.to_ascii_lowercase();
        if !is_sha256_hex(&digest) {
            return Err(ComplianceError::Configuration(format!(
                "not a SHA-256 hex digest: {}",
                hex_digest
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO known_hashes (digest, label, registered_at)
            VALUES (?, ?, ?)
            ON CONFLICT(digest) DO NOTHING
            "#,
        )
        .bind(&digest)
        .bind(label)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl HashRegistry for SqliteHashRegistry {
    async fn lookup_known_hash(&self, hex_digest: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT digest FROM known_hashes WHERE digest = ?")
                .bind(hex_digest.to_ascii_lowercase())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

/// Release records keyed by subject id
#[derive(Clone)]
pub struct SqliteVault {
    pool: SqlitePool,
}

impl SqliteVault {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the release record for a subject
    pub async fn put_record(&self, record: &VaultRecord) -> Result<()> {
        let attributes = serde_json::to_string(&record.attributes)?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO vault_records (subject_id, attributes, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(subject_id) DO UPDATE SET attributes = ?, updated_at = ?
            "#,
        )
        .bind(&record.subject_id)
        .bind(&attributes)
        .bind(&now)
        .bind(&attributes)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Vault for SqliteVault {
    async fn fetch_vault_record(&self, subject_id: &str) -> Result<Option<VaultRecord>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT attributes FROM vault_records WHERE subject_id = ?")
                .bind(subject_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(attributes,)| {
            Ok(VaultRecord::new(
                subject_id,
                parse_object("attributes", &attributes)?,
            ))
        })
        .transpose()
    }
}
