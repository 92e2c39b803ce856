//! Shapes of the plans proposed by the generative backend.
//!
//! Every field is optional: the backend is asked for a strict shape but
//! nothing guarantees it, and missing fields are defaulted later during
//! materialization rather than rejected here. Ordinals that arrive with the
//! wrong JSON type are read leniently, and anything unreadable becomes `None`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Top-level response object requested from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanEnvelope {
    #[serde(default)]
    pub plans: Vec<LogicalPlan>,
}

/// A proposed weekly plan for one difficulty tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub days: Vec<LogicalDay>,
}

/// One day of a proposed plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalDay {
    /// Day-of-week ordinal, 1 through 7.
    #[serde(
        default,
        deserialize_with = "lenient_ordinal",
        skip_serializing_if = "Option::is_none"
    )]
    pub day: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub workouts: Vec<LogicalWorkout>,
}

/// One scheduled exercise, referencing the catalog by title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalWorkout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_name: Option<String>,
    /// Start time, `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_ordinal",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<i64>,
}

/// `null` reads as an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `3`, `3.0` or `"3"`. Any other value reads as `None`.
fn lenient_ordinal<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(ordinal_from_value(&value))
}

fn ordinal_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
