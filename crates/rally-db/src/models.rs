use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Difficulty tier of a catalog exercise and of a generated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
pub enum Level {
    Basic,
    Intermediate,
    Advanced,
}

impl Level {
    /// All tiers, easiest first.
    pub const ALL: [Level; 3] = [Level::Basic, Level::Intermediate, Level::Advanced];
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        };
        f.write_str(s)
    }
}

impl FromStr for Level {
    type Err = LevelParseError;

    /// Case-insensitive; also accepts the Vietnamese labels used by the
    /// first catalog this service was fed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" | "beginner" | "cơ bản" => Ok(Self::Basic),
            "intermediate" | "trung bình" => Ok(Self::Intermediate),
            "advanced" | "nâng cao" => Ok(Self::Advanced),
            _ => Err(LevelParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Level`] string.
#[derive(Debug, Clone)]
pub struct LevelParseError(pub String);

impl fmt::Display for LevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid level: {:?}", self.0)
    }
}

impl std::error::Error for LevelParseError {}

// ---------------------------------------------------------------------------

/// Kind of schedule a persisted plan represents. Only weekly plans exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Weekly,
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => f.write_str("weekly"),
        }
    }
}

// ---------------------------------------------------------------------------
// Goal
// ---------------------------------------------------------------------------

/// A training goal as it appears in storage: users and catalog records both
/// carry a `goal` that may be missing, a single string, or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalValue {
    Absent,
    Text(String),
    /// Stringified list elements, falsy JSON elements already dropped.
    List(Vec<String>),
    /// Any other JSON shape (number, object, bool).
    Unrecognized,
}

impl GoalValue {
    /// Interpret a JSONB `goal` column.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(s)) => Self::Text(s.clone()),
            Some(Value::Array(items)) => Self::List(
                items
                    .iter()
                    .filter(|item| is_truthy(item))
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Some(_) => Self::Unrecognized,
        }
    }

    /// Whether this goal names `goal` exactly, either as its whole text or
    /// as one list member.
    pub fn matches(&self, goal: &str) -> bool {
        match self {
            Self::Text(s) => s == goal,
            Self::List(items) => items.iter().any(|item| item == goal),
            Self::Absent | Self::Unrecognized => false,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Plan document
// ---------------------------------------------------------------------------

/// One scheduled exercise within a persisted day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWorkout {
    pub id: Uuid,
    /// Catalog id of the exercise; `None` when the generated name did not
    /// resolve against the catalog.
    pub training_id: Option<Uuid>,
    pub time: String,
    pub note: String,
    pub order: i64,
}

/// One day of a persisted weekly plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDay {
    pub id: Uuid,
    pub day: i64,
    pub workouts: Vec<PlanWorkout>,
}

/// A plan ready to be written: everything except the storage-assigned id,
/// owner, and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPlan {
    pub name: String,
    pub description: String,
    pub goal: String,
    pub level: String,
    pub plan_type: PlanType,
    pub is_active: bool,
    pub plan_days: Vec<PlanDay>,
}

impl PersistedPlan {
    /// Number of workouts whose exercise reference is null.
    pub fn unresolved_references(&self) -> usize {
        self.plan_days
            .iter()
            .flat_map(|d| d.workouts.iter())
            .filter(|w| w.training_id.is_none())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A user profile as read for plan generation. The password hash column is
/// never selected into this struct.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub goal: Option<Value>,
    pub badminton_level: Option<String>,
    pub badminton_experience: Option<String>,
    pub height_cm: Option<f32>,
    pub weight_kg: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn goal_value(&self) -> GoalValue {
        GoalValue::from_json(self.goal.as_ref())
    }
}

/// An exercise in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExerciseRecord {
    pub id: Uuid,
    pub title: String,
    pub goal: Option<Value>,
    pub level: Level,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl ExerciseRecord {
    pub fn goal_value(&self) -> GoalValue {
        GoalValue::from_json(self.goal.as_ref())
    }
}

/// A stored weekly training plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPlan {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub goal: String,
    pub level: String,
    pub plan_type: PlanType,
    pub is_active: bool,
    pub plan_days: Json<Vec<PlanDay>>,
    pub unresolved_references: i32,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn level_display_roundtrip() {
        for v in &Level::ALL {
            let parsed: Level = v.to_string().parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn level_accepts_aliases() {
        assert_eq!("BASIC".parse::<Level>().unwrap(), Level::Basic);
        assert_eq!(" Trung bình ".parse::<Level>().unwrap(), Level::Intermediate);
        assert_eq!("Nâng cao".parse::<Level>().unwrap(), Level::Advanced);
    }

    #[test]
    fn level_invalid() {
        assert!("expert".parse::<Level>().is_err());
    }

    #[test]
    fn goal_value_shapes() {
        assert_eq!(GoalValue::from_json(None), GoalValue::Absent);
        assert_eq!(GoalValue::from_json(Some(&Value::Null)), GoalValue::Absent);
        assert_eq!(
            GoalValue::from_json(Some(&json!("smash power"))),
            GoalValue::Text("smash power".to_string())
        );
        assert_eq!(
            GoalValue::from_json(Some(&json!(42))),
            GoalValue::Unrecognized
        );
    }

    #[test]
    fn goal_value_list_drops_falsy_elements() {
        let raw = json!(["footwork", "", null, 0, false, 3, "defence"]);
        assert_eq!(
            GoalValue::from_json(Some(&raw)),
            GoalValue::List(vec![
                "footwork".to_string(),
                "3".to_string(),
                "defence".to_string()
            ])
        );
    }

    #[test]
    fn goal_value_matches_text_and_members() {
        let text = GoalValue::Text("stamina".to_string());
        assert!(text.matches("stamina"));
        assert!(!text.matches("stamina, speed"));

        let list = GoalValue::List(vec!["stamina".to_string(), "speed".to_string()]);
        assert!(list.matches("speed"));
        assert!(!list.matches("power"));

        assert!(!GoalValue::Absent.matches(""));
    }

    #[test]
    fn persisted_plan_counts_unresolved() {
        let workout = |training_id| PlanWorkout {
            id: Uuid::new_v4(),
            training_id,
            time: "18:00".to_string(),
            note: String::new(),
            order: 1,
        };
        let plan = PersistedPlan {
            name: "p".to_string(),
            description: String::new(),
            goal: String::new(),
            level: "Basic".to_string(),
            plan_type: PlanType::Weekly,
            is_active: true,
            plan_days: vec![PlanDay {
                id: Uuid::new_v4(),
                day: 1,
                workouts: vec![workout(Some(Uuid::new_v4())), workout(None), workout(None)],
            }],
        };
        assert_eq!(plan.unresolved_references(), 2);
    }

    #[test]
    fn plan_workout_serializes_camel_case_null_reference() {
        let w = PlanWorkout {
            id: Uuid::nil(),
            training_id: None,
            time: "07:30".to_string(),
            note: "warm up".to_string(),
            order: 2,
        };
        let v = serde_json::to_value(&w).unwrap();
        assert!(v["trainingId"].is_null());
        assert_eq!(v["time"], "07:30");
        assert_eq!(v["order"], 2);
    }
}
