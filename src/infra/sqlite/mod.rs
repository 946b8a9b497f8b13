//! SQLite implementations of the compliance stores
//!
//! All stores share one pool. Timestamps are stored as RFC 3339 text and
//! JSON payloads as serialized text.

mod flags;
mod registry;
mod reports;

pub use flags::*;
pub use registry::*;
pub use reports::*;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::infra::{ComplianceError, Result};

/// Open a pool for a `sqlite://` URL, creating the file if missing
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Open a single-connection in-memory pool
///
/// The connection is never recycled; dropping it would drop the database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn initialize(pool: &SqlitePool) -> Result<()> {
    crate::migrations::run_sqlite(pool)
        .await
        .map_err(|e| ComplianceError::Migration(e.to_string()))
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ComplianceError::Internal(format!("Invalid {}: {}", column, e)))
}

pub(crate) fn parse_object(
    column: &str,
    value: &str,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(ComplianceError::Internal(format!(
            "Invalid {}: expected a JSON object",
            column
        ))),
        Err(e) => Err(ComplianceError::Internal(format!("Invalid {}: {}", column, e))),
    }
}
