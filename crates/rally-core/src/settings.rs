//! Tunables for the plan generation pipeline.
//!
//! Several behaviors the service has historically varied on (minimum
//! workouts per day, what to do when the backend call fails) are explicit
//! settings here rather than hard-coded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_MIN_CANDIDATES;

/// Upper bound on workouts per day requested from the backend.
pub const MAX_WORKOUTS_PER_DAY: usize = 6;

/// What the pipeline does when the backend call fails after all retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendFailurePolicy {
    /// Surface the failure to the caller.
    Fail,
    /// Complete the request with zero plans and an error marker.
    EmptyFallback,
}

/// Retry behavior around the generative backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetrySettings {
    /// Delay before retry number `retry` (1-based), before jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Pipeline settings, embeddable in the `[pipeline]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Lower bound on workouts per day stated in the prompt and checked in
    /// the shape diagnostics. 3 by default; 2 is the relaxed variant.
    pub min_workouts_per_day: usize,
    pub on_backend_failure: BackendFailurePolicy,
    /// Catalog filter fallback threshold.
    pub min_catalog_candidates: usize,
    /// Mark the user's earlier plans inactive before storing new ones.
    pub deactivate_previous_plans: bool,
    pub retry: RetrySettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_workouts_per_day: 3,
            on_backend_failure: BackendFailurePolicy::EmptyFallback,
            min_catalog_candidates: DEFAULT_MIN_CANDIDATES,
            deactivate_previous_plans: false,
            retry: RetrySettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Check the settings are coherent. Called once at startup.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_workouts_per_day == 0 || self.min_workouts_per_day > MAX_WORKOUTS_PER_DAY {
            return Err(format!(
                "min_workouts_per_day must be between 1 and {MAX_WORKOUTS_PER_DAY}, got {}",
                self.min_workouts_per_day
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err("retry.initial_backoff_ms exceeds retry.max_backoff_ms".to_string());
        }
        Ok(())
    }
}
