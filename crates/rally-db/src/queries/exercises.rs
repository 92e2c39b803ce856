//! Database query functions for the `trainings` (exercise catalog) table.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;

use crate::models::{ExerciseRecord, Level};

/// Insert a catalog exercise.
pub async fn insert_exercise(
    pool: &PgPool,
    title: &str,
    goal: Option<&Value>,
    level: Level,
    description: &str,
) -> Result<ExerciseRecord> {
    let record = sqlx::query_as::<_, ExerciseRecord>(
        "INSERT INTO trainings (title, goal, level, description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(title)
    .bind(goal)
    .bind(level)
    .bind(description)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert exercise {title:?}"))?;

    Ok(record)
}

/// List the whole catalog, ordered by level then title so prompts are stable
/// across requests.
pub async fn list_exercises(pool: &PgPool) -> Result<Vec<ExerciseRecord>> {
    let records = sqlx::query_as::<_, ExerciseRecord>(
        "SELECT * FROM trainings \
         ORDER BY CASE level WHEN 'Basic' THEN 0 WHEN 'Intermediate' THEN 1 ELSE 2 END, title",
    )
    .fetch_all(pool)
    .await
    .context("failed to list exercises")?;

    Ok(records)
}
