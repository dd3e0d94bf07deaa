use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::{AppError, AppResult};
use crate::services::dashboard::{build_dashboard, Dashboard};
use crate::AppState;

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage<'a> {
    title: &'a str,
    attribution: &'a str,
    calendar_heading: &'a str,
    events_heading: &'a str,
    logo_url: String,
    dashboard: &'a Dashboard,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    title: &'a str,
    message: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(dashboard_page))
}

/// Full page render. Any failure replaces the whole page with one error message.
async fn dashboard_page(State(state): State<Arc<AppState>>) -> Response {
    match render_dashboard(&state).await {
        Ok(html) => Html(html).into_response(),
        Err(err) => error_page(&state, err),
    }
}

async fn render_dashboard(state: &AppState) -> AppResult<String> {
    let settings = &state.config.dashboard;
    let dashboard = build_dashboard(state.warehouse.as_ref(), settings).await?;

    let page = DashboardPage {
        title: &settings.title,
        attribution: &settings.attribution,
        calendar_heading: &settings.calendar_heading,
        events_heading: &settings.events_heading,
        logo_url: format!("/static/{}", settings.logo_path.trim_start_matches('/')),
        dashboard: &dashboard,
    };

    Ok(page.render()?)
}

fn error_page(state: &AppState, err: AppError) -> Response {
    let (status, _) = err.classify();
    let page = ErrorPage {
        title: &state.config.dashboard.title,
        message: err.to_string(),
    };

    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(render_err) => {
            tracing::error!("Failed to render error page: {:?}", render_err);
            (status, format!("An error occurred: {}", err)).into_response()
        }
    }
}
