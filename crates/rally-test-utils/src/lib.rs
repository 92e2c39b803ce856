//! Shared test utilities for rally integration tests.
//!
//! Provides a PostgreSQL instance shared across the tests of one binary.
//! Each test gets its own freshly migrated database within the instance.
//!
//! Two modes:
//! - **`RALLY_TEST_PG_URL`** set: use that server directly.
//! - **No env var**: start a container via testcontainers, shared per test
//!   binary through a `OnceCell`.
//!
//! Also provides small catalog/user fixtures used by several crates.

use std::time::Duration;

use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use rally_db::models::{ExerciseRecord, Level, UserProfile};
use rally_db::pool;
use rally_db::queries::exercises::insert_exercise;
use rally_db::queries::users::{NewUser, insert_user};

struct SharedPg {
    base_url: String,
    /// Held to keep the container alive. `None` when using an external URL.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("RALLY_TEST_PG_URL") {
        return SharedPg {
            base_url: url,
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("18")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Base URL (no database name) of the shared PostgreSQL.
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

/// Create a temporary database with migrations applied.
///
/// Returns `(pool, db_name)`. Call [`drop_test_db`] with `db_name` when done.
pub async fn create_test_db() -> (PgPool, String) {
    let base_url = pg_url().await;

    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&format!("{base_url}/postgres"))
        .await
        .expect("failed to connect to maintenance database");

    let db_name = format!("rally_test_{}", Uuid::new_v4().simple());
    let stmt = format!("CREATE DATABASE {db_name}");
    maint_pool
        .execute(stmt.as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint_pool.close().await;

    let temp_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&format!("{base_url}/{db_name}"))
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e}"));

    pool::run_migrations(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a temporary database, terminating its connections first.
pub async fn drop_test_db(db_name: &str) {
    let base_url = pg_url().await;

    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&format!("{base_url}/postgres"))
        .await
        .expect("failed to connect to maintenance database for cleanup");

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint_pool.execute(terminate.as_str()).await;

    let stmt = format!("DROP DATABASE IF EXISTS {db_name}");
    let _ = maint_pool.execute(stmt.as_str()).await;
    maint_pool.close().await;
}

/// Insert a user whose goal is the given JSON value.
pub async fn seed_user(pool: &PgPool, name: &str, goal: serde_json::Value) -> UserProfile {
    insert_user(
        pool,
        &NewUser {
            name,
            password_hash: Some("$argon2id$not-a-real-hash"),
            goal: Some(&goal),
            badminton_level: Some("Basic"),
            badminton_experience: Some("6 months"),
            height_cm: Some(172.0),
            weight_kg: Some(65.5),
        },
    )
    .await
    .expect("insert_user should succeed")
}

/// Insert `per_level` exercises at every tier, all tagged with `goal`.
///
/// Titles look like `"<goal> drill Basic 1"`.
pub async fn seed_catalog(pool: &PgPool, goal: &str, per_level: usize) -> Vec<ExerciseRecord> {
    let mut records = Vec::new();
    for level in Level::ALL {
        for i in 1..=per_level {
            let title = format!("{goal} drill {level} {i}");
            let record = insert_exercise(
                pool,
                &title,
                Some(&json!(goal)),
                level,
                &format!("{level} drill number {i}"),
            )
            .await
            .expect("insert_exercise should succeed");
            records.push(record);
        }
    }
    records
}
