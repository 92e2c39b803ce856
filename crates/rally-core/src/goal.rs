//! Goal normalization: every downstream step sees one display string.

use rally_db::models::GoalValue;

/// Used when a user has no usable goal.
pub const DEFAULT_GOAL: &str = "improve badminton skills";

/// Characters stripped from both ends of a string goal. Goals written by
/// older clients sometimes arrive as a stringified list, e.g. `"['smash']"`.
const STRIP_CHARS: &[char] = &['[', ']', '\'', '"', ' '];

/// Coerce a goal of any stored shape into one non-empty display string.
///
/// Lists are joined with `", "`, strings lose surrounding brackets, quotes,
/// and spaces, and anything else (or an empty result) becomes
/// [`DEFAULT_GOAL`].
pub fn normalize_goal(goal: &GoalValue) -> String {
    let cleaned = match goal {
        GoalValue::List(items) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        GoalValue::Text(text) => text.trim_matches(STRIP_CHARS).trim().to_string(),
        GoalValue::Absent | GoalValue::Unrecognized => String::new(),
    };

    if cleaned.is_empty() {
        DEFAULT_GOAL.to_string()
    } else {
        cleaned
    }
}
