use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::error::AppResult;
use crate::services::dashboard::{build_dashboard, Dashboard};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// The grouped calendar and weekly views as JSON, for clients that draw their own page.
async fn get_dashboard(State(state): State<Arc<AppState>>) -> AppResult<Json<Dashboard>> {
    let dashboard = build_dashboard(state.warehouse.as_ref(), &state.config.dashboard).await?;
    Ok(Json(dashboard))
}
