//! Database query functions for the `users` table.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::UserProfile;

/// Columns selected for a [`UserProfile`]. `password_hash` is never read.
const PROFILE_COLUMNS: &str = "id, name, goal, badminton_level, badminton_experience, \
                               height_cm, weight_kg, created_at";

/// Fields for inserting a user.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub password_hash: Option<&'a str>,
    pub goal: Option<&'a Value>,
    pub badminton_level: Option<&'a str>,
    pub badminton_experience: Option<&'a str>,
    pub height_cm: Option<f32>,
    pub weight_kg: Option<f32>,
}

/// Insert a user and return its profile.
pub async fn insert_user(pool: &PgPool, user: &NewUser<'_>) -> Result<UserProfile> {
    let query = format!(
        "INSERT INTO users (name, password_hash, goal, badminton_level, badminton_experience, height_cm, weight_kg) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {PROFILE_COLUMNS}"
    );
    let profile = sqlx::query_as::<_, UserProfile>(&query)
        .bind(user.name)
        .bind(user.password_hash)
        .bind(user.goal)
        .bind(user.badminton_level)
        .bind(user.badminton_experience)
        .bind(user.height_cm)
        .bind(user.weight_kg)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to insert user {:?}", user.name))?;

    Ok(profile)
}

/// Fetch a user profile by id.
pub async fn get_user_profile(pool: &PgPool, id: Uuid) -> Result<Option<UserProfile>> {
    let query = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1");
    let profile = sqlx::query_as::<_, UserProfile>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user profile")?;

    Ok(profile)
}
