//! Time limits for external collaborator calls
//!
//! Collaborators are not retried; an elapsed limit is reported as
//! [`ComplianceError::Timeout`] and handled by the caller's failure policy.

use std::future::Future;
use std::time::Duration;

use super::{ComplianceError, Result};

/// Default time limit for a single collaborator call
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Await `fut`, failing with a timeout error after `limit`
pub async fn bounded<T, F>(collaborator: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                collaborator,
                timeout_ms = limit.as_millis() as u64,
                "Collaborator call timed out"
            );
            Err(ComplianceError::Timeout {
                collaborator,
                after_ms: limit.as_millis() as u64,
            })
        }
    }
}
