//! Retrying appends.
//!
//! Re-runs the whole read-modify-write cycle when it failed without writing
//! anything. A conflict means some other writer committed in between, so
//! every retry after a conflict starts from a table that has grown.

use genlog_core::{LogEntry, LogTable, RemoteLogStore};
use genlog_fetch::RetryStrategy;
use tracing::{debug, warn};

use crate::error::LogError;
use crate::sync::append;

/// Appends `entry`, retrying failures that left the table untouched.
///
/// Returns the number of attempts used.
///
/// # Errors
///
/// Returns the last error once the strategy allows no further attempt, or
/// immediately for errors where a retry could duplicate the row.
pub async fn append_with_retry<S>(
    entry: &LogEntry,
    table: &LogTable,
    store: &S,
    strategy: &RetryStrategy,
) -> Result<u32, LogError>
where
    S: RemoteLogStore + ?Sized,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match append(entry, table, store).await {
            Ok(()) => {
                debug!(attempt, "Log append succeeded");
                return Ok(attempt);
            }
            Err(e) if e.is_retryable() && strategy.allows_another(attempt) => {
                let delay = strategy.delay_for_attempt(attempt);
                warn!(
                    attempt,
                    error = %e,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Log append failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
