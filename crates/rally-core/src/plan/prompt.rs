//! Prompt construction for plan generation.
//!
//! The prompt states the hard constraints as an enumerated list, embeds the
//! user profile and the filtered catalog as JSON, and pins the response
//! shape with a skeleton for each of the three tiers. Pure logic, no I/O.

use std::fmt::Write as _;

use rally_db::models::{Level, UserProfile};

use crate::catalog::CatalogEntry;
use crate::settings::MAX_WORKOUTS_PER_DAY;

/// Everything the prompt is rendered from.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub profile: &'a UserProfile,
    /// Normalized goal.
    pub goal: &'a str,
    /// The catalog subset the backend may choose from.
    pub catalog: &'a [CatalogEntry],
    pub min_workouts_per_day: usize,
}

/// Display name and description used in each tier's skeleton.
fn tier_blurb(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::Basic => (
            "Basic plan - Building foundations",
            "For beginners or players with little experience",
        ),
        Level::Intermediate => (
            "Intermediate plan - Speed and power",
            "For players with solid foundations who want clear progress",
        ),
        Level::Advanced => (
            "Advanced plan - Refining technique and tactics",
            "For long-time or competitive players",
        ),
    }
}

/// Render the full instruction payload.
pub fn build_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::with_capacity(8192);

    prompt.push_str(
        "You are a professional badminton coach. Create exactly 3 one-week \
         training plans for this user, one per difficulty tier:\n",
    );
    for (i, level) in Level::ALL.iter().enumerate() {
        let _ = writeln!(prompt, "- Plan {}: {level}", i + 1);
    }
    prompt.push('\n');

    prompt.push_str("=== MANDATORY RULES - DO NOT BREAK ===\n");
    let mut rule = 0;
    let mut next_rule = || {
        rule += 1;
        rule
    };
    for level in Level::ALL {
        let _ = writeln!(
            prompt,
            "{}. The {level} plan uses ONLY exercises whose \"level\" is \"{level}\"",
            next_rule()
        );
    }
    let _ = writeln!(
        prompt,
        "{}. Each plan has EXACTLY 7 days, numbered 1 to 7 in order (none missing, none reordered)",
        next_rule()
    );
    let _ = writeln!(
        prompt,
        "{}. Each day has AT LEAST {} and AT MOST {} workouts",
        next_rule(),
        ctx.min_workouts_per_day,
        MAX_WORKOUTS_PER_DAY
    );
    let _ = writeln!(
        prompt,
        "{}. Every exercise you choose MUST serve the user's goal",
        next_rule()
    );
    let _ = writeln!(
        prompt,
        "{}. Every workout MUST reference a real exercise from the list below; never leave it unmatched",
        next_rule()
    );
    prompt.push_str(
        "Never borrow an exercise from another level, not even one. If exercises \
         run short, shorten sessions instead of breaking the rules.\n\n",
    );

    prompt.push_str("=== USER GOAL (use exactly) ===\n");
    prompt.push_str(ctx.goal);
    prompt.push_str("\n\n");

    prompt.push_str("### User profile:\n");
    prompt.push_str(&to_json(ctx.profile));
    prompt.push_str("\n\n");

    prompt.push_str("### Exercise list (use only titles from this list, verbatim):\n");
    prompt.push_str(&to_json(&ctx.catalog));
    prompt.push_str("\n\n");

    prompt.push_str("Return exactly this JSON shape and NOTHING outside the JSON:\n");
    prompt.push_str(&response_skeleton(ctx.goal));
    prompt.push_str("\n\n");

    prompt.push_str("Each workout has exactly 4 fields:\n");
    prompt.push_str("- \"trainingName\": the exact title from the exercise list\n");
    prompt.push_str("- \"note\": a detailed, easy to follow note\n");
    prompt.push_str(
        "- \"time\": start time in HH:MM format (for example \"18:00\", \"09:00\", \"20:00\")\n",
    );
    prompt.push_str("- \"order\": integer position within the day\n\n");
    prompt.push_str("Return plain JSON only: no ```json fences, no explanations.");

    prompt
}

/// Example response with one full skeleton per tier.
fn response_skeleton(goal: &str) -> String {
    let plans: Vec<serde_json::Value> = Level::ALL
        .iter()
        .map(|level| {
            let (name, description) = tier_blurb(*level);
            serde_json::json!({
                "name": name,
                "description": description,
                "goal": goal,
                "level": level.to_string(),
                "days": [{
                    "day": 1,
                    "workouts": [{
                        "trainingName": format!("<exact {level} exercise title>"),
                        "note": "<what to focus on>",
                        "time": "18:00",
                        "order": 1
                    }]
                }, "... days 2 to 7 in the same shape ..."]
            })
        })
        .collect();
    to_json(&serde_json::json!({ "plans": plans }))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}
