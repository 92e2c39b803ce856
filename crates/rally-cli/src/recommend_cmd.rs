//! `rally recommend` and `rally plans` commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use rally_core::backend::{GeminiBackend, GenerativeBackend, ScriptedBackend};
use rally_core::plan::{RecommendError, RecommendOutcome, recommend_training_plans};
use rally_core::settings::PipelineSettings;
use rally_db::models::TrainingPlan;
use rally_db::queries::training_plans;

use crate::config::BackendSettings;

/// Build the backend for a command.
///
/// With a response file, its contents are replayed instead of calling the
/// model. Otherwise the Gemini config is validated here.
pub fn build_backend(
    settings: &BackendSettings,
    response_file: Option<&Path>,
) -> Result<Arc<dyn GenerativeBackend>> {
    if let Some(path) = response_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read response file {}", path.display()))?;
        tracing::info!(path = %path.display(), "replaying captured backend response");
        return Ok(Arc::new(ScriptedBackend::always(text)));
    }
    let backend = GeminiBackend::new(settings.gemini_config()?)
        .context("failed to build Gemini backend")?;
    Ok(Arc::new(backend))
}

/// Run the recommend command.
pub async fn run_recommend(
    pool: &PgPool,
    backend: &dyn GenerativeBackend,
    settings: &PipelineSettings,
    user_id_str: &str,
) -> Result<()> {
    let user_id =
        Uuid::parse_str(user_id_str).with_context(|| format!("invalid user ID: {user_id_str}"))?;

    match recommend_training_plans(pool, backend, settings, user_id).await {
        Ok(outcome) => {
            print!("{}", render_outcome(&outcome));
            Ok(())
        }
        Err(RecommendError::MalformedResponse { raw, source }) => {
            eprintln!("Raw backend output:\n{raw}");
            Err(anyhow::Error::new(source).context("backend response is not valid plan JSON"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Human-readable summary of a recommendation.
pub fn render_outcome(outcome: &RecommendOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("Goal: {}\n", outcome.goal));

    if let Some(ref err) = outcome.backend_error {
        out.push_str(&format!("No plans generated: {err}\n"));
        return out;
    }

    out.push_str(&format!("Stored {} plan(s)\n", outcome.plan_ids.len()));
    for (plan, report) in outcome.plans.iter().zip(&outcome.reports) {
        out.push_str(&format!(
            "  {}  [{}] {}  unresolved={}\n",
            report.plan_id,
            plan.level.as_deref().unwrap_or("?"),
            plan.name.as_deref().unwrap_or(""),
            report.unresolved_references,
        ));
        for w in &report.warnings {
            out.push_str(&format!("    warning: {w}\n"));
        }
    }
    for w in &outcome.set_warnings {
        out.push_str(&format!("warning: {w}\n"));
    }
    out
}

/// Run the plans command: list a user's stored plans.
pub async fn run_plans(pool: &PgPool, user_id_str: &str) -> Result<()> {
    let user_id =
        Uuid::parse_str(user_id_str).with_context(|| format!("invalid user ID: {user_id_str}"))?;

    let plans = training_plans::list_training_plans_for_user(pool, user_id).await?;
    if plans.is_empty() {
        println!("No training plans for user {user_id}.");
        return Ok(());
    }
    for plan in &plans {
        println!("{}", render_plan_line(plan));
    }
    Ok(())
}

fn render_plan_line(plan: &TrainingPlan) -> String {
    let workouts: usize = plan.plan_days.0.iter().map(|d| d.workouts.len()).sum();
    format!(
        "{}  {:<12} {:<8} days={} workouts={} unresolved={}  {}  {}",
        plan.id,
        plan.level,
        if plan.is_active { "active" } else { "inactive" },
        plan.plan_days.0.len(),
        workouts,
        plan.unresolved_references,
        plan.created_at.format("%Y-%m-%d %H:%M"),
        plan.name,
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Utc;
    use rally_core::plan::{LogicalPlan, PlanReport};
    use rally_db::models::{PlanDay, PlanType};
    use sqlx::types::Json;

    use super::*;

    fn backend_settings() -> BackendSettings {
        BackendSettings {
            api_key: None,
            model: "gemini-test".to_string(),
            base_url: "http://localhost:1".to_string(),
            timeout: std::time::Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn response_file_builds_replay_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"plans\": []}}").unwrap();

        let backend = build_backend(&backend_settings(), Some(file.path())).unwrap();
        assert_eq!(backend.name(), "scripted");
        let text = backend
            .generate(&rally_core::backend::GenerationRequest::json("p"))
            .await
            .unwrap();
        assert_eq!(text, "{\"plans\": []}");
    }

    #[test]
    fn missing_response_file_is_an_error() {
        let err = build_backend(&backend_settings(), Some(Path::new("/nonexistent/r.json")))
            .err()
            .unwrap();
        assert!(err.to_string().contains("failed to read response file"));
    }

    #[test]
    fn gemini_backend_needs_api_key() {
        let err = build_backend(&backend_settings(), None).err().unwrap();
        assert!(err.to_string().contains("API key not found"));

        let mut settings = backend_settings();
        settings.api_key = Some("k".to_string());
        let backend = build_backend(&settings, None).unwrap();
        assert_eq!(backend.name(), "gemini");
    }

    #[test]
    fn render_outcome_lists_plans_and_warnings() {
        let id = Uuid::new_v4();
        let outcome = RecommendOutcome {
            plan_ids: vec![id],
            plans: vec![LogicalPlan {
                name: Some("Basic week".to_string()),
                level: Some("Basic".to_string()),
                ..Default::default()
            }],
            reports: vec![PlanReport {
                plan_id: id,
                unresolved_references: 1,
                warnings: vec!["expected 7 days, got 0".to_string()],
            }],
            set_warnings: vec!["expected 3 plans, got 1".to_string()],
            backend_error: None,
            goal: "footwork".to_string(),
        };
        let text = render_outcome(&outcome);
        assert!(text.starts_with("Goal: footwork\nStored 1 plan(s)\n"));
        assert!(text.contains(&format!("{id}  [Basic] Basic week  unresolved=1")));
        assert!(text.contains("    warning: expected 7 days, got 0"));
        assert!(text.ends_with("warning: expected 3 plans, got 1\n"));
    }

    #[test]
    fn render_outcome_reports_fallback() {
        let outcome = RecommendOutcome {
            plan_ids: vec![],
            plans: vec![],
            reports: vec![],
            set_warnings: vec![],
            backend_error: Some("backend quota exceeded: daily".to_string()),
            goal: "footwork".to_string(),
        };
        assert_eq!(
            render_outcome(&outcome),
            "Goal: footwork\nNo plans generated: backend quota exceeded: daily\n"
        );
    }

    #[test]
    fn plan_line_summarizes_counts() {
        let plan = TrainingPlan {
            id: Uuid::nil(),
            user_id: None,
            name: "Advanced week".to_string(),
            description: String::new(),
            goal: "footwork".to_string(),
            level: "Advanced".to_string(),
            plan_type: PlanType::Weekly,
            is_active: false,
            plan_days: Json(vec![
                PlanDay {
                    id: Uuid::new_v4(),
                    day: 1,
                    workouts: vec![],
                },
                PlanDay {
                    id: Uuid::new_v4(),
                    day: 2,
                    workouts: vec![],
                },
            ]),
            unresolved_references: 0,
            created_at: Utc::now(),
        };
        let line = render_plan_line(&plan);
        assert!(line.contains("inactive"));
        assert!(line.contains("days=2 workouts=0 unresolved=0"));
        assert!(line.ends_with("Advanced week"));
    }
}
