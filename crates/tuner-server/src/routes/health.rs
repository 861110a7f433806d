//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: HealthComponents,
    pub metrics: HealthMetrics,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthComponents {
    pub oracle_configured: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub sessions: usize,
    pub conversations: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    let oracle_configured = state.oracle.is_configured();

    let sessions = state.optimizer.history().len().unwrap_or(0);
    let conversations = state.conversations.len().await;

    // Without credentials every completion comes back empty
    let status = if oracle_configured {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: HealthComponents { oracle_configured },
        metrics: HealthMetrics {
            sessions,
            conversations,
        },
    })
}
