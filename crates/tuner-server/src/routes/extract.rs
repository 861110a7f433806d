//! Parameter extraction route.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/extract", post(extract_parameters))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub global_prompt: String,
    pub extraction_prompt: String,
    pub user_input: String,
}

async fn extract_parameters(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let params = state
        .extractor
        .extract(
            &request.global_prompt,
            &request.extraction_prompt,
            &request.user_input,
        )
        .await?;
    Ok(Json(params))
}
