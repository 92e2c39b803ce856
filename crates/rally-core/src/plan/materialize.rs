//! Plan materialization: turn a backend-proposed plan into the document that
//! gets persisted.
//!
//! Missing fields are defaulted, exercise titles are resolved through the
//! per-request [`NameToIdMap`], and every day and workout gets a fresh id.
//! Unresolved titles become a null exercise reference, never an error.

use uuid::Uuid;

use rally_db::models::{PersistedPlan, PlanDay, PlanType, PlanWorkout};

use super::types::{LogicalDay, LogicalPlan, LogicalWorkout};
use crate::catalog::NameToIdMap;

/// Plan name used when the backend omitted one.
pub const DEFAULT_PLAN_NAME: &str = "Training plan";

/// Build the persisted form of `plan`.
pub fn materialize_plan(plan: &LogicalPlan, names: &NameToIdMap) -> PersistedPlan {
    PersistedPlan {
        name: plan
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_PLAN_NAME.to_string()),
        description: plan.description.clone().unwrap_or_default(),
        goal: plan.goal.clone().unwrap_or_default(),
        level: plan.level.clone().unwrap_or_default(),
        plan_type: PlanType::Weekly,
        is_active: true,
        plan_days: plan.days.iter().map(|d| materialize_day(d, names)).collect(),
    }
}

fn materialize_day(day: &LogicalDay, names: &NameToIdMap) -> PlanDay {
    PlanDay {
        id: Uuid::new_v4(),
        day: day.day.unwrap_or(1),
        workouts: day
            .workouts
            .iter()
            .map(|w| materialize_workout(w, names))
            .collect(),
    }
}

fn materialize_workout(workout: &LogicalWorkout, names: &NameToIdMap) -> PlanWorkout {
    let training_id = workout
        .training_name
        .as_deref()
        .and_then(|name| names.resolve(name));

    if training_id.is_none() {
        tracing::debug!(
            training_name = workout.training_name.as_deref().unwrap_or(""),
            "workout references unknown exercise"
        );
    }

    PlanWorkout {
        id: Uuid::new_v4(),
        training_id,
        time: workout.time.clone().unwrap_or_default(),
        note: workout.note.clone().unwrap_or_default(),
        order: workout.order.unwrap_or(0),
    }
}
