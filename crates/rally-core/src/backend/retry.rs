//! Bounded retry with exponential backoff around a backend call.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::trait_def::{BackendError, GenerationRequest, GenerativeBackend};
use crate::settings::RetrySettings;

/// Call `backend`, retrying transient failures per `retry`.
///
/// Permanent failures return immediately. After the last attempt the final
/// error is returned.
pub async fn generate_with_retry(
    backend: &dyn GenerativeBackend,
    request: &GenerationRequest,
    retry: &RetrySettings,
) -> Result<String, BackendError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match backend.generate(request).await {
            Ok(text) => return Ok(text),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = with_jitter(retry.backoff(attempt));
                warn!(
                    backend = backend.name(),
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient backend failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(
                    backend = backend.name(),
                    attempt,
                    transient = err.is_transient(),
                    error = %err,
                    "backend call failed"
                );
                return Err(err);
            }
        }
    }
}

/// Add up to 25% random jitter.
fn with_jitter(base: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    let jitter = rand::rng().random_range(0..=base_ms / 4);
    Duration::from_millis(base_ms + jitter)
}
