use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::csp::csp_middleware;
use crate::AppState;

pub mod api;
pub mod dashboard;
pub mod health;

/// All routes with shared state and the per-response middleware.
/// Rate limiting and CORS are layered on in `main`.
pub fn app(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.dashboard.static_dir);

    Router::new()
        .route("/health", get(health::health_check))
        .merge(dashboard::router())
        .nest("/api", api::router())
        .nest_service("/static", static_dir)
        .with_state(state)
        .layer(axum::middleware::from_fn(csp_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::services::dashboard::fixtures::FakeWarehouse;

    fn test_app(warehouse: FakeWarehouse) -> Router {
        app(Arc::new(AppState {
            config: Config::default(),
            warehouse: Arc::new(warehouse),
        }))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String, Option<String>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap(), content_type)
    }

    #[tokio::test]
    async fn health_reports_dataset() {
        let (status, body, _) = get(test_app(FakeWarehouse::sample()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["dataset"], "aljohnsonex.TRUMP");
    }

    #[tokio::test]
    async fn dashboard_page_renders_both_columns() {
        let (status, body, content_type) = get(test_app(FakeWarehouse::sample()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));

        assert!(body.contains("White House Tracker"));
        assert!(body.contains("Trump Calendar"));
        assert!(body.contains("Recent Events"));

        // calendar column
        assert!(body.contains("Tuesday, February 4th"));
        assert!(body.contains("02:00 PM: Signs executive orders"));
        assert!(body.contains("Receives intelligence briefing"));
        assert!(!body.contains("12:01 AM"));
        assert!(body.contains("Florida"));
        assert!(!body.contains("<Florida>"));

        // weekly column
        assert!(body.contains("Week of February 3, 2025"));
        assert!(body.contains("Trade dominated the week"));
        assert!(body.contains("Action: Executive Order"));
        assert!(body.contains("<u>Energy</u>: expands drilling"));
        assert!(body.contains("Closing words"));

        // newest week first, and only the first section of each list opens
        let newest = body.find("Week of February 3, 2025").unwrap();
        let older = body.find("Week of January 27, 2025").unwrap();
        assert!(newest < older);
        assert_eq!(body.matches(" open>").count(), 2);
    }

    #[tokio::test]
    async fn action_events_omit_video_link() {
        let (_, body, _) = get(test_app(FakeWarehouse::sample()), "/").await;
        // one calendar video link plus the non-action summary's video link
        assert_eq!(body.matches(">Video</a>").count(), 2);
        assert!(!body.contains("video/3"));
    }

    #[tokio::test]
    async fn fetch_failure_renders_single_error() {
        let warehouse = FakeWarehouse {
            fail_weekly: true,
            ..FakeWarehouse::sample()
        };
        let (status, body, _) = get(test_app(warehouse), "/").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("An error occurred: Warehouse error: weekly table unavailable"));
        assert!(!body.contains("Trump Calendar"));
    }

    #[tokio::test]
    async fn api_returns_grouped_json() {
        let (status, body, _) = get(test_app(FakeWarehouse::sample()), "/api/dashboard").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["calendar"][0]["label"], "Tuesday, February 4th");
        assert_eq!(json["calendar"][0]["expanded"], true);
        assert_eq!(json["calendar"][1]["expanded"], false);
        assert_eq!(json["weeks"][0]["week"], "2025-02-03");
        assert_eq!(json["weeks"][0]["events"][0]["video_url"], serde_json::Value::Null);
        assert_eq!(json["weeks"][0]["events"][1]["bullets"][0]["topic"], "Tariffs");
    }

    #[tokio::test]
    async fn api_failure_uses_error_envelope() {
        let warehouse = FakeWarehouse {
            fail_weekly: true,
            ..FakeWarehouse::sample()
        };
        let (status, body, _) = get(test_app(warehouse), "/api/dashboard").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"]["code"], "WAREHOUSE_ERROR");
    }
}
