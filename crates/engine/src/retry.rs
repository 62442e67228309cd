// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded exponential backoff for transient store errors

use crate::config::MigrationConfig;
use soma_store::StoreError;
use std::future::Future;
use thiserror::Error;

/// Errors from a retried store operation
#[derive(Debug, Error)]
pub enum RetryError {
    /// Transient failures persisted past the retry budget
    #[error("retries exhausted for {op} after {attempts} attempts: {source}")]
    Exhausted {
        op: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },
    /// Non-transient failure; retrying would not help
    #[error(transparent)]
    Fatal(#[from] StoreError),
}

/// Run `call` until it succeeds, retrying transient errors with doubling
/// delays up to `max_retries` extra attempts.
pub async fn with_retry<T, F, Fut>(
    config: &MigrationConfig,
    op: &str,
    mut call: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(RetryError::Fatal(err)),
            Err(err) if attempt >= config.max_retries => {
                return Err(RetryError::Exhausted {
                    op: op.to_string(),
                    attempts: attempt + 1,
                    source: err,
                });
            }
            Err(err) => {
                let delay = config
                    .retry_base_delay
                    .saturating_mul(1u32 << attempt.min(16));
                tracing::warn!(
                    op,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient store error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
