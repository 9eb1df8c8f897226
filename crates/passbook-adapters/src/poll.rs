//! Bounded status polling for banks that generate documents asynchronously.

use passbook_core::{AdapterError, AdapterSettings, Result};
use std::future::Future;

/// Re-run `check` until it yields a value or the attempt bound is reached.
///
/// Each attempt waits `settings.poll_interval` first, then calls `check` with
/// the 1-based attempt number. `Ok(None)` means "not ready yet"; an error from
/// `check` stops polling immediately. After `settings.poll_max_attempts`
/// unready answers the call fails with [`AdapterError::GenerationTimeout`].
pub async fn poll_until<T, F, Fut>(
    settings: &AdapterSettings,
    bank: &str,
    statement_id: &str,
    mut check: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let attempts = settings.poll_max_attempts;
    for attempt in 1..=attempts {
        tokio::time::sleep(settings.poll_interval).await;
        if let Some(value) = check(attempt).await? {
            tracing::debug!(bank, attempt, "Document ready");
            return Ok(value);
        }
        tracing::trace!(bank, attempt, attempts, "Document not ready");
    }

    tracing::warn!(bank, attempts, "Document generation did not finish");
    Err(AdapterError::GenerationTimeout {
        bank: bank.to_string(),
        statement_id: statement_id.to_string(),
        attempts,
    })
}
