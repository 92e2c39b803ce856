//! Query functions, one module per table.

pub mod exercises;
pub mod training_plans;
pub mod users;
