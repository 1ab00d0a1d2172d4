//! Deadline for the server-side TLS upgrade.
//!
//! The guarded future owns the connection. When the deadline passes the
//! future is dropped, which closes the connection and unblocks the peer.

use crate::BootstrapError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Run `fut` to completion or fail with [`BootstrapError::Timeout`] after `limit`.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, BootstrapError>
where
    F: Future<Output = Result<T, BootstrapError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            debug!(timeout_ms = limit.as_millis() as u64, "deadline hit, dropping connection");
            Err(BootstrapError::Timeout(limit))
        }
    }
}
