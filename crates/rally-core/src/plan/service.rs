//! Plan generation service.
//!
//! Runs the full request: load the user, normalize the goal, filter the
//! catalog, prompt the backend, parse and check the response, then persist
//! each plan as its own document.

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use rally_db::queries::{exercises, training_plans, users};

use super::check::{check_plan_set, check_plan_shape};
use super::materialize::materialize_plan;
use super::parser::parse_backend_response;
use super::prompt::{PromptContext, build_prompt};
use super::types::LogicalPlan;
use crate::backend::{BackendError, GenerationRequest, GenerativeBackend, generate_with_retry};
use crate::catalog::{CatalogEntry, NameToIdMap, filter_catalog};
use crate::goal::normalize_goal;
use crate::settings::{BackendFailurePolicy, PipelineSettings};

/// Failures that end a recommendation request.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("backend response is not valid plan JSON: {source}")]
    MalformedResponse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// Only returned under [`BackendFailurePolicy::Fail`].
    #[error("generative backend unavailable: {0}")]
    BackendUnavailable(#[source] BackendError),

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Per-plan diagnostics returned alongside the stored ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub plan_id: Uuid,
    pub unresolved_references: usize,
    pub warnings: Vec<String>,
}

/// Result of a completed recommendation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendOutcome {
    /// Ids of the stored plans, in backend order.
    pub plan_ids: Vec<Uuid>,
    /// The plans as the backend proposed them.
    pub plans: Vec<LogicalPlan>,
    pub reports: Vec<PlanReport>,
    /// Warnings about the plan set as a whole.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub set_warnings: Vec<String>,
    /// Set when the backend failed and the empty fallback was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_error: Option<String>,
    pub goal: String,
}

impl RecommendOutcome {
    fn empty_fallback(goal: String, err: &BackendError) -> Self {
        Self {
            plan_ids: Vec::new(),
            plans: Vec::new(),
            reports: Vec::new(),
            set_warnings: Vec::new(),
            backend_error: Some(err.to_string()),
            goal,
        }
    }
}

/// Generate and store the three tiered weekly plans for `user_id`.
///
/// Plans are inserted one at a time. A storage failure part way through
/// leaves the earlier plans stored and returns [`RecommendError::Storage`].
/// With `deactivate_previous_plans`, older plans are deactivated only after
/// every new plan is stored, and never when nothing was stored.
#[instrument(skip(pool, backend, settings), fields(backend = backend.name()))]
pub async fn recommend_training_plans(
    pool: &PgPool,
    backend: &dyn GenerativeBackend,
    settings: &PipelineSettings,
    user_id: Uuid,
) -> Result<RecommendOutcome, RecommendError> {
    let profile = users::get_user_profile(pool, user_id)
        .await?
        .ok_or(RecommendError::UserNotFound(user_id))?;

    let goal = normalize_goal(&profile.goal_value());

    let catalog = exercises::list_exercises(pool).await?;
    let subset = filter_catalog(&goal, &catalog, settings.min_catalog_candidates);
    let names = NameToIdMap::from_records(&subset);
    info!(
        goal = %goal,
        catalog = catalog.len(),
        candidates = subset.len(),
        "catalog filtered"
    );

    let entries: Vec<CatalogEntry> = subset.iter().map(CatalogEntry::from).collect();
    let prompt = build_prompt(&PromptContext {
        profile: &profile,
        goal: &goal,
        catalog: &entries,
        min_workouts_per_day: settings.min_workouts_per_day,
    });

    let raw = match generate_with_retry(
        backend,
        &GenerationRequest::json(prompt),
        &settings.retry,
    )
    .await
    {
        Ok(raw) => raw,
        Err(err) => {
            return match settings.on_backend_failure {
                BackendFailurePolicy::Fail => Err(RecommendError::BackendUnavailable(err)),
                BackendFailurePolicy::EmptyFallback => {
                    warn!(error = %err, "backend failed, returning empty plan set");
                    Ok(RecommendOutcome::empty_fallback(goal, &err))
                }
            };
        }
    };

    let plans = parse_backend_response(&raw).map_err(|e| RecommendError::MalformedResponse {
        raw: e.raw,
        source: e.source,
    })?;

    let set_warnings = check_plan_set(&plans);
    for w in &set_warnings {
        warn!(warning = %w, "plan set shape");
    }

    let mut plan_ids = Vec::with_capacity(plans.len());
    let mut reports = Vec::with_capacity(plans.len());
    for plan in &plans {
        let warnings = check_plan_shape(plan, &names, settings.min_workouts_per_day);
        let persisted = materialize_plan(plan, &names);
        let unresolved = persisted.unresolved_references();

        let plan_id = training_plans::insert_training_plan(pool, Some(user_id), &persisted).await?;
        for w in &warnings {
            warn!(%plan_id, level = %persisted.level, warning = %w, "plan shape");
        }
        info!(%plan_id, level = %persisted.level, unresolved, "plan stored");

        plan_ids.push(plan_id);
        reports.push(PlanReport {
            plan_id,
            unresolved_references: unresolved,
            warnings,
        });
    }

    // After the inserts: an empty or failed set leaves older plans active.
    if settings.deactivate_previous_plans && !plan_ids.is_empty() {
        let deactivated =
            training_plans::deactivate_plans_for_user(pool, user_id, &plan_ids).await?;
        info!(deactivated, "previous plans deactivated");
    }

    Ok(RecommendOutcome {
        plan_ids,
        plans,
        reports,
        set_warnings,
        backend_error: None,
        goal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_outcome_serializes_error_marker() {
        let outcome = RecommendOutcome::empty_fallback(
            "footwork".to_string(),
            &BackendError::QuotaExceeded("daily limit".to_string()),
        );
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["planIds"], serde_json::json!([]));
        assert_eq!(v["plans"], serde_json::json!([]));
        assert!(v["backendError"].as_str().unwrap().contains("daily limit"));
        assert!(v.get("setWarnings").is_none());
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = PlanReport {
            plan_id: Uuid::nil(),
            unresolved_references: 2,
            warnings: vec!["day 1 has 2 workouts, expected 3..=6".to_string()],
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["unresolvedReferences"], 2);
        assert_eq!(v["planId"], Uuid::nil().to_string());
    }
}
