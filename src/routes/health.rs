use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    /// `project.dataset` the dashboard reads from.
    pub dataset: String,
}

/// Liveness only; the warehouse is not contacted.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        dataset: format!(
            "{}.{}",
            state.config.warehouse.project_id, state.config.warehouse.dataset_id
        ),
    };

    (StatusCode::OK, Json(response))
}
