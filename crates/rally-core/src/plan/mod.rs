//! Plan generation: prompt, response parsing, shape checks,
//! materialization, and the end-to-end service.

pub mod check;
pub mod materialize;
pub mod parser;
pub mod prompt;
pub mod service;
pub mod types;

pub use check::{check_plan_set, check_plan_shape};
pub use materialize::materialize_plan;
pub use parser::{PlanParseError, parse_backend_response};
pub use prompt::{PromptContext, build_prompt};
pub use service::{PlanReport, RecommendError, RecommendOutcome, recommend_training_plans};
pub use types::{LogicalDay, LogicalPlan, LogicalWorkout};
