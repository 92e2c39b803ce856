//! Plan generation pipeline: goal normalization, catalog filtering, prompt
//! construction, backend response parsing, materialization, persistence.

pub mod backend;
pub mod catalog;
pub mod goal;
pub mod plan;
pub mod settings;
