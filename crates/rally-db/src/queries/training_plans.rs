//! Database query functions for the `training_plans` table.
//!
//! A plan is written as a single row with its days and workouts nested in
//! the `plan_days` JSONB column, so each insert is one atomic document.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{PersistedPlan, TrainingPlan};

/// Insert one plan document. Returns the generated plan id.
///
/// Always a plain insert: no merge with, or uniqueness check against, the
/// user's existing plans.
pub async fn insert_training_plan(
    pool: &PgPool,
    user_id: Option<Uuid>,
    plan: &PersistedPlan,
) -> Result<Uuid> {
    let unresolved = i32::try_from(plan.unresolved_references()).unwrap_or(i32::MAX);

    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO training_plans \
         (user_id, name, description, goal, level, plan_type, is_active, plan_days, unresolved_references) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id",
    )
    .bind(user_id)
    .bind(&plan.name)
    .bind(&plan.description)
    .bind(&plan.goal)
    .bind(&plan.level)
    .bind(plan.plan_type)
    .bind(plan.is_active)
    .bind(Json(&plan.plan_days))
    .bind(unresolved)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert training plan {:?}", plan.name))?;

    Ok(id)
}

/// Fetch a plan by id.
pub async fn get_training_plan(pool: &PgPool, id: Uuid) -> Result<Option<TrainingPlan>> {
    let plan = sqlx::query_as::<_, TrainingPlan>("SELECT * FROM training_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch training plan")?;

    Ok(plan)
}

/// List a user's plans, newest first.
pub async fn list_training_plans_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<TrainingPlan>> {
    let plans = sqlx::query_as::<_, TrainingPlan>(
        "SELECT * FROM training_plans WHERE user_id = $1 ORDER BY created_at DESC, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list training plans")?;

    Ok(plans)
}

/// Mark a user's active plans inactive, except those whose ids are in
/// `keep`. Returns how many changed.
pub async fn deactivate_plans_for_user(
    pool: &PgPool,
    user_id: Uuid,
    keep: &[Uuid],
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE training_plans SET is_active = false \
         WHERE user_id = $1 AND is_active AND id <> ALL($2)",
    )
    .bind(user_id)
    .bind(keep)
    .execute(pool)
    .await
    .context("failed to deactivate training plans")?;

    Ok(result.rows_affected())
}
