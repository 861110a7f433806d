//! Optimization routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use tuner_core::{EvaluationReport, OptimizationResult, OptimizeRequest, PromptHistory, TestCase};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/optimize", post(optimize))
        .route("/optimize/single", post(optimize_single))
        .route("/optimize/test", post(service_status))
        .route("/optimize/evaluate", post(evaluate))
        .route("/optimize/history", get(list_history))
        .route("/optimize/history/{id}", get(get_history))
}

/// Run the bounded optimization loop
async fn optimize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Json<OptimizationResult>, ApiError> {
    let Json(request) = payload?;
    let result = state.optimizer.optimize(&request, &state.loop_options()).await?;
    Ok(Json(result))
}

/// Run a single generate → rewrite → judge pass
async fn optimize_single(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Json<OptimizationResult>, ApiError> {
    let Json(request) = payload?;
    let result = state
        .optimizer
        .optimize(&request, &state.single_pass_options())
        .await?;
    Ok(Json(result))
}

#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
}

async fn service_status() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "Optimization service is running",
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub global_prompt: String,
    pub prompt: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Score a prompt against caller-supplied test cases
async fn evaluate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluationReport>, ApiError> {
    let Json(request) = payload?;
    if request.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".into()));
    }

    info!("Evaluating prompt against {} test cases", request.test_cases.len());
    let report = state
        .optimizer
        .evaluator()
        .evaluate(&request.global_prompt, &request.prompt, &request.test_cases)
        .await?;
    Ok(Json(report))
}

/// List session ids, oldest first
async fn list_history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let ids = state.optimizer.history().list_ids()?;
    Ok(Json(ids))
}

/// Get one session history
async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PromptHistory>, ApiError> {
    state
        .optimizer
        .history()
        .get(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", id)))
}
