//! Parsing of raw backend output.
//!
//! Output that is not the expected JSON is rejected with the raw text kept
//! verbatim for diagnostics. No partial recovery is attempted.

use thiserror::Error;

use super::types::{LogicalPlan, PlanEnvelope};

/// The backend response could not be read as a plan envelope.
#[derive(Debug, Error)]
#[error("backend response is not valid plan JSON: {source}")]
pub struct PlanParseError {
    /// The unparsed response, unchanged.
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

/// Parse the backend's raw text into its list of plans.
///
/// A valid object without a `plans` field yields an empty list.
pub fn parse_backend_response(raw: &str) -> Result<Vec<LogicalPlan>, PlanParseError> {
    serde_json::from_str::<PlanEnvelope>(raw)
        .map(|envelope| envelope.plans)
        .map_err(|source| PlanParseError {
            raw: raw.to_owned(),
            source,
        })
}
