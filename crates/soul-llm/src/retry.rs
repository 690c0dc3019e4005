//! Exponential backoff with jitter, for transient LLM failures (spec §4.1,
//! §7 kind 1).
//!
//! The growth/cap shape is adapted from the teacher's supervisor backoff
//! (`SupervisorState::current_backoff_ms`, doubling and capping at a max);
//! this adds the 10-20% jitter spec §4.1 calls for, since the teacher's
//! poll loop has no such requirement.

use crate::provider::LlmError;
use rand::Rng;
use std::time::Duration;
use tracing::warn;

const BASE_DELAY_MS: u64 = 200;
const MAX_DELAY_MS: u64 = 5_000;
const MULTIPLIER: f64 = 2.0;

/// Retries `attempt` up to `max_attempts` times, applying exponential
/// backoff with 10-20% jitter between transient failures. Non-transient
/// errors are returned immediately without retry.
pub async fn with_backoff<T, F, Fut>(max_attempts: usize, mut attempt: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, LlmError>>,
{
    let mut delay_ms = BASE_DELAY_MS;
    let mut last_err = None;

    for attempt_number in 1..=max_attempts.max(1) {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt_number < max_attempts => {
                let jitter_fraction = rand::thread_rng().gen_range(0.10..0.20);
                let jittered = delay_ms + (delay_ms as f64 * jitter_fraction) as u64;
                warn!(
                    attempt = attempt_number,
                    delay_ms = jittered,
                    error = %err,
                    "transient LLM failure, retrying"
                );
                tokio::time::sleep(Duration::from_millis(jittered)).await;
                delay_ms = ((delay_ms as f64) * MULTIPLIER).min(MAX_DELAY_MS as f64) as u64;
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_err.unwrap_or(LlmError::CapabilityMissing))
}
