//! Shape diagnostics for backend-proposed plans.
//!
//! These checks mirror the hard constraints stated in the prompt. They only
//! report: a violating plan is still materialized and persisted.

use std::collections::HashSet;

use rally_db::models::Level;

use super::types::LogicalPlan;
use crate::catalog::NameToIdMap;
use crate::settings::MAX_WORKOUTS_PER_DAY;

/// Number of plans requested per generation, one per tier.
pub const EXPECTED_PLANS: usize = 3;

/// Days in a weekly plan.
pub const DAYS_PER_WEEK: usize = 7;

/// Check one plan against the per-plan constraints.
///
/// Returns human-readable warnings; an empty list means the plan conforms.
pub fn check_plan_shape(
    plan: &LogicalPlan,
    names: &NameToIdMap,
    min_workouts_per_day: usize,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let level = match plan.level.as_deref() {
        None => {
            warnings.push("plan has no level".to_string());
            None
        }
        Some(raw) => match raw.parse::<Level>() {
            Ok(level) => Some(level),
            Err(e) => {
                warnings.push(e.to_string());
                None
            }
        },
    };

    if plan.days.len() != DAYS_PER_WEEK {
        warnings.push(format!(
            "expected {DAYS_PER_WEEK} days, got {}",
            plan.days.len()
        ));
    }

    let ordinals: Vec<Option<i64>> = plan.days.iter().map(|d| d.day).collect();
    let in_order = ordinals
        .iter()
        .enumerate()
        .all(|(i, d)| *d == Some(i as i64 + 1));
    if !in_order {
        let rendered: Vec<String> = ordinals
            .iter()
            .map(|d| d.map_or_else(|| "?".to_string(), |n| n.to_string()))
            .collect();
        warnings.push(format!(
            "days are not numbered 1..{} in order: [{}]",
            plan.days.len(),
            rendered.join(", ")
        ));
    }

    for (i, day) in plan.days.iter().enumerate() {
        let label = day.day.unwrap_or(i as i64 + 1);
        let count = day.workouts.len();
        if count < min_workouts_per_day || count > MAX_WORKOUTS_PER_DAY {
            warnings.push(format!(
                "day {label} has {count} workouts, expected {min_workouts_per_day}..={MAX_WORKOUTS_PER_DAY}"
            ));
        }

        for workout in &day.workouts {
            let Some(name) = workout.training_name.as_deref() else {
                warnings.push(format!("day {label} has a workout without an exercise name"));
                continue;
            };
            match names.level_of(name) {
                None => {
                    warnings.push(format!("day {label}: unknown exercise {name:?}"));
                }
                Some(exercise_level) => match level {
                    Some(plan_level) if exercise_level != plan_level => {
                        warnings.push(format!(
                            "day {label}: {exercise_level} exercise {name:?} in {plan_level} plan"
                        ));
                    }
                    _ => {}
                },
            }
        }
    }

    warnings
}

/// Check the plan set as a whole: count and tier coverage.
pub fn check_plan_set(plans: &[LogicalPlan]) -> Vec<String> {
    let mut warnings = Vec::new();

    if plans.len() != EXPECTED_PLANS {
        warnings.push(format!(
            "expected {EXPECTED_PLANS} plans, got {}",
            plans.len()
        ));
    }

    let mut seen = HashSet::new();
    let levels = plans
        .iter()
        .filter_map(|p| p.level.as_deref().and_then(|l| l.parse::<Level>().ok()));
    for level in levels {
        if !seen.insert(level) {
            warnings.push(format!("more than one {level} plan"));
        }
    }
    if !plans.is_empty() {
        for level in Level::ALL {
            if !seen.contains(&level) {
                warnings.push(format!("no {level} plan"));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rally_db::models::ExerciseRecord;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::plan::types::{LogicalDay, LogicalWorkout};

    fn names() -> NameToIdMap {
        let record = |title: &str, level| ExerciseRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            goal: Some(json!("footwork")),
            level,
            description: String::new(),
            created_at: Utc::now(),
        };
        NameToIdMap::from_records(&[
            record("Shadow footwork", Level::Basic),
            record("Wall rally", Level::Basic),
            record("Skipping", Level::Basic),
            record("Jump smash ladder", Level::Advanced),
        ])
    }

    fn workout(name: &str) -> LogicalWorkout {
        LogicalWorkout {
            training_name: Some(name.to_string()),
            time: Some("18:00".to_string()),
            note: None,
            order: Some(1),
        }
    }

    fn conforming(level: &str) -> LogicalPlan {
        LogicalPlan {
            name: Some(format!("{level} week")),
            level: Some(level.to_string()),
            days: (1..=7)
                .map(|d| LogicalDay {
                    day: Some(d),
                    workouts: vec![
                        workout("Shadow footwork"),
                        workout("Wall rally"),
                        workout("Skipping"),
                    ],
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn conforming_plan_has_no_warnings() {
        assert!(check_plan_shape(&conforming("Basic"), &names(), 3).is_empty());
    }

    #[test]
    fn reports_wrong_day_count_and_order() {
        let mut plan = conforming("Basic");
        plan.days.truncate(6);
        plan.days.swap(0, 1);
        let warnings = check_plan_shape(&plan, &names(), 3);
        assert!(warnings.iter().any(|w| w == "expected 7 days, got 6"));
        assert!(warnings.iter().any(|w| w.contains("[2, 1, 3, 4, 5, 6]")));
    }

    #[test]
    fn reports_workout_count_outside_bounds() {
        let mut plan = conforming("Basic");
        plan.days[0].workouts.truncate(2);
        plan.days[1].workouts = vec![workout("Skipping"); 7];
        let warnings = check_plan_shape(&plan, &names(), 3);
        assert!(warnings.contains(&"day 1 has 2 workouts, expected 3..=6".to_string()));
        assert!(warnings.contains(&"day 2 has 7 workouts, expected 3..=6".to_string()));

        // The relaxed minimum accepts two.
        let relaxed = check_plan_shape(&plan, &names(), 2);
        assert!(!relaxed.iter().any(|w| w.starts_with("day 1 has")));
    }

    #[test]
    fn reports_unknown_and_cross_tier_exercises() {
        let mut plan = conforming("Basic");
        plan.days[0].workouts[0] = workout("Unknown Drill");
        plan.days[2].workouts[1] = workout("Jump smash ladder");
        let warnings = check_plan_shape(&plan, &names(), 3);
        assert!(warnings.contains(&"day 1: unknown exercise \"Unknown Drill\"".to_string()));
        assert!(warnings.contains(
            &"day 3: Advanced exercise \"Jump smash ladder\" in Basic plan".to_string()
        ));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn reports_missing_or_invalid_level() {
        let mut plan = conforming("Basic");
        plan.level = None;
        assert!(check_plan_shape(&plan, &names(), 3).contains(&"plan has no level".to_string()));

        plan.level = Some("Expert".to_string());
        let warnings = check_plan_shape(&plan, &names(), 3);
        assert!(warnings.iter().any(|w| w.contains("invalid level")));
    }

    #[test]
    fn localized_level_labels_are_accepted() {
        let plan = conforming("Cơ bản");
        assert!(check_plan_shape(&plan, &names(), 3).is_empty());
    }

    #[test]
    fn plan_set_with_one_per_tier_is_clean() {
        let plans = vec![
            conforming("Basic"),
            conforming("Intermediate"),
            conforming("Advanced"),
        ];
        assert!(check_plan_set(&plans).is_empty());
    }

    #[test]
    fn plan_set_reports_count_and_duplicates() {
        let plans = vec![conforming("Basic"), conforming("Basic")];
        let warnings = check_plan_set(&plans);
        assert!(warnings.contains(&"expected 3 plans, got 2".to_string()));
        assert!(warnings.contains(&"more than one Basic plan".to_string()));
        assert!(warnings.contains(&"no Intermediate plan".to_string()));
        assert!(warnings.contains(&"no Advanced plan".to_string()));
    }

    #[test]
    fn empty_plan_set_only_reports_count() {
        assert_eq!(check_plan_set(&[]), vec!["expected 3 plans, got 0".to_string()]);
    }
}
