//! Storage layer for rally: users, the exercise catalog, and persisted
//! training plans, on PostgreSQL.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
