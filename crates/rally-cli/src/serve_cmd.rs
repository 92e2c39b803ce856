use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use rally_core::backend::GenerativeBackend;
use rally_core::plan::{LogicalPlan, PlanReport, RecommendError, recommend_training_plans};
use rally_core::settings::PipelineSettings;
use rally_db::queries::training_plans;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub backend: Arc<dyn GenerativeBackend>,
    pub settings: Arc<PipelineSettings>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    /// Unparsed backend output, echoed for malformed responses.
    raw: Option<String>,
}

impl AppError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            raw: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl From<RecommendError> for AppError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::UserNotFound(_) => Self::not_found("User not found"),
            RecommendError::MalformedResponse { raw, source } => {
                tracing::warn!(error = %source, "backend returned malformed plan JSON");
                Self {
                    status: StatusCode::BAD_REQUEST,
                    message: "AI response is not valid JSON".to_string(),
                    raw: Some(raw),
                }
            }
            RecommendError::BackendUnavailable(e) => {
                Self::new(StatusCode::BAD_GATEWAY, e.to_string())
            }
            RecommendError::Storage(e) => {
                tracing::error!(error = %format!("{e:#}"), "storage failure");
                Self::internal(e)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let mut body = serde_json::json!({ "error": self.message });
        if let Some(raw) = self.raw {
            body["raw"] = serde_json::Value::String(raw);
        }
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub message: String,
    pub plan_ids: Vec<Uuid>,
    pub plans: Vec<LogicalPlan>,
    pub reports: Vec<PlanReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/recommend/training-plan/{user_id}", get(recommend))
        .route("/api/training-plans/{id}", get(get_plan))
        .route("/api/users/{user_id}/training-plans", get(list_user_plans))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let backend = state.backend.name().to_string();
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%backend, "rally serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("rally serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("invalid {what}: {raw:?}")))
}

async fn recommend(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let user_id = parse_id(&user_id, "user id")?;

    let outcome =
        recommend_training_plans(&state.pool, state.backend.as_ref(), &state.settings, user_id)
            .await?;

    let message = match outcome.backend_error {
        Some(_) => "No training plans were generated".to_string(),
        None => format!("Created and saved {} training plans", outcome.plan_ids.len()),
    };

    Ok(Json(RecommendResponse {
        message,
        plan_ids: outcome.plan_ids,
        plans: outcome.plans,
        reports: outcome.reports,
        warnings: outcome.set_warnings,
        error: outcome.backend_error,
    })
    .into_response())
}

async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let id = parse_id(&id, "plan id")?;
    let plan = training_plans::get_training_plan(&state.pool, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("training plan {id} not found")))?;

    Ok(Json(plan).into_response())
}

async fn list_user_plans(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let user_id = parse_id(&user_id, "user id")?;
    let plans = training_plans::list_training_plans_for_user(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(plans).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
