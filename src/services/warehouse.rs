use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::WarehouseConfig;
use crate::error::{AppError, AppResult};
use crate::models::{CalendarEvent, SummaryEvent, TableRows, WeeklySummary};
use crate::services::credentials::CredentialProvider;

/// Read-only source of the three timeline record sets.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn calendar_events(&self) -> AppResult<Vec<CalendarEvent>>;

    async fn summary_events(&self) -> AppResult<Vec<SummaryEvent>>;

    async fn weekly_summaries(&self) -> AppResult<Vec<WeeklySummary>>;
}

// ============================================================================
// BigQuery REST types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    location: &'a str,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub job_complete: bool,
    pub job_reference: Option<JobReference>,
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
pub struct FieldSchema {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: serde_json::Value,
}

impl TableCell {
    fn into_text(self) -> Option<String> {
        match self.v {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

fn append_rows(target: &mut TableRows, rows: Vec<TableRow>) {
    target
        .rows
        .extend(rows.into_iter().map(|r| r.f.into_iter().map(TableCell::into_text).collect()));
}

// ============================================================================
// Client
// ============================================================================

pub struct BigQueryWarehouse {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    config: WarehouseConfig,
}

impl BigQueryWarehouse {
    pub fn new(config: &WarehouseConfig, credentials: Arc<dyn CredentialProvider>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_millis(config.query_timeout_ms) + StdDuration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        tracing::info!(
            "Warehouse client for {}.{} ({}) using {} credentials",
            config.project_id,
            config.dataset_id,
            config.region,
            credentials.kind()
        );

        Ok(Self {
            client,
            credentials,
            config: config.clone(),
        })
    }

    pub fn select_all_sql(&self, table: &str) -> String {
        format!(
            "SELECT * FROM `{}.{}.{}`",
            self.config.project_id, self.config.dataset_id, table
        )
    }

    fn project_url(&self) -> String {
        format!(
            "{}/projects/{}",
            self.config.api_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.project_id)
        )
    }

    async fn check(&self, response: reqwest::Response, what: &str) -> AppResult<QueryResponse> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Warehouse(format!(
                "{} failed ({}): {}",
                what, status, error_text
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Warehouse(format!("Failed to parse {} response: {}", what, e)))?;

        if !parsed.job_complete {
            return Err(AppError::Warehouse(format!(
                "{} did not complete within {}ms",
                what, self.config.query_timeout_ms
            )));
        }

        Ok(parsed)
    }

    /// Run `SELECT *` against one table and return every row.
    pub async fn fetch_table(&self, table: &str) -> AppResult<TableRows> {
        let sql = self.select_all_sql(table);
        let token = self.credentials.access_token().await?;

        tracing::debug!("Running warehouse query: {}", sql);

        let response = self
            .client
            .post(format!("{}/queries", self.project_url()))
            .bearer_auth(&token)
            .json(&QueryRequest {
                query: &sql,
                use_legacy_sql: false,
                location: &self.config.region,
                timeout_ms: self.config.query_timeout_ms,
            })
            .send()
            .await?;
        let first = self.check(response, "jobs.query").await?;

        let columns = first
            .schema
            .map(|s| s.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default();
        let mut result = TableRows::new(table, columns);
        append_rows(&mut result, first.rows);

        let mut page_token = first.page_token;
        while let Some(token_value) = page_token.take() {
            let job = first.job_reference.as_ref().ok_or_else(|| {
                AppError::Warehouse("Paged result without a job reference".to_string())
            })?;
            let location = job.location.as_deref().unwrap_or(&self.config.region);

            let response = self
                .client
                .get(format!(
                    "{}/projects/{}/queries/{}",
                    self.config.api_url.trim_end_matches('/'),
                    urlencoding::encode(&job.project_id),
                    urlencoding::encode(&job.job_id)
                ))
                .bearer_auth(&token)
                .query(&[("pageToken", token_value.as_str()), ("location", location)])
                .send()
                .await?;
            let page = self.check(response, "jobs.getQueryResults").await?;
            append_rows(&mut result, page.rows);
            page_token = page.page_token;
        }

        tracing::debug!("Fetched {} rows from {}", result.len(), table);
        Ok(result)
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn calendar_events(&self) -> AppResult<Vec<CalendarEvent>> {
        self.fetch_table(&self.config.calendar_table)
            .await?
            .decode(CalendarEvent::from_row)
    }

    async fn summary_events(&self) -> AppResult<Vec<SummaryEvent>> {
        self.fetch_table(&self.config.summary_table)
            .await?
            .decode(SummaryEvent::from_row)
    }

    async fn weekly_summaries(&self) -> AppResult<Vec<WeeklySummary>> {
        self.fetch_table(&self.config.weekly_table)
            .await?
            .decode(WeeklySummary::from_row)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        extract::Query,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::services::dashboard::fixtures::serve;

    struct StaticToken;

    #[async_trait]
    impl CredentialProvider for StaticToken {
        async fn access_token(&self) -> AppResult<String> {
            Ok("test-token".to_string())
        }

        fn kind(&self) -> &'static str {
            "static"
        }
    }

    fn calendar_schema() -> serde_json::Value {
        json!({"fields": [
            {"name": "date", "type": "DATE"},
            {"name": "time", "type": "TIME"},
            {"name": "details", "type": "STRING"},
            {"name": "url", "type": "STRING"},
            {"name": "video_url", "type": "STRING"}
        ]})
    }

    async fn warehouse_at(router: Router) -> BigQueryWarehouse {
        let mut config = Config::default().warehouse;
        config.api_url = serve(router).await;
        BigQueryWarehouse::new(&config, Arc::new(StaticToken)).unwrap()
    }

    #[test]
    fn query_response_decodes_cells_by_schema() {
        let body = r#"{
            "kind": "bigquery#queryResponse",
            "schema": {"fields": [
                {"name": "date", "type": "DATE"},
                {"name": "time", "type": "TIME"},
                {"name": "details", "type": "STRING"},
                {"name": "url", "type": "STRING"},
                {"name": "video_url", "type": "STRING"}
            ]},
            "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
            "totalRows": "2",
            "rows": [
                {"f": [{"v": "2025-02-03"}, {"v": "10:00:00"}, {"v": "Arrives"}, {"v": null}, {"v": null}]},
                {"f": [{"v": "2025-02-02"}, {"v": null}, {"v": "No events"}, {"v": "https://t"}, {"v": null}]}
            ],
            "jobComplete": true
        }"#;

        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.job_complete);
        assert!(parsed.page_token.is_none());

        let columns = parsed
            .schema
            .map(|s| s.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default();
        let mut rows = TableRows::new("calendar", columns);
        append_rows(&mut rows, parsed.rows);

        let events = rows.decode(CalendarEvent::from_row).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].time.as_deref(), Some("10:00:00"));
        assert_eq!(events[1].time, None);
        assert_eq!(events[1].url.as_deref(), Some("https://t"));
    }

    #[test]
    fn incomplete_job_response_parses_without_rows() {
        let parsed: QueryResponse =
            serde_json::from_str(r#"{"jobComplete": false, "jobReference": {"projectId": "p", "jobId": "j"}}"#)
                .unwrap();
        assert!(!parsed.job_complete);
        assert!(parsed.rows.is_empty());
        assert!(parsed.schema.is_none());
    }

    #[tokio::test]
    async fn fetch_follows_page_tokens() {
        async fn first_page(Json(request): Json<serde_json::Value>) -> Json<serde_json::Value> {
            assert_eq!(request["query"], "SELECT * FROM `aljohnsonex.TRUMP.calendar`");
            assert_eq!(request["useLegacySql"], false);
            Json(json!({
                "jobComplete": true,
                "jobReference": {"projectId": "aljohnsonex", "jobId": "job_1", "location": "US"},
                "schema": calendar_schema(),
                "rows": [
                    {"f": [{"v": "2025-02-04"}, {"v": "14:00:00"}, {"v": "Signs orders"}, {"v": null}, {"v": null}]},
                    {"f": [{"v": "2025-02-04"}, {"v": null}, {"v": "Briefing"}, {"v": null}, {"v": null}]}
                ],
                "pageToken": "p2"
            }))
        }

        async fn next_page(Query(params): Query<HashMap<String, String>>) -> Response {
            if params.get("pageToken").map(String::as_str) != Some("p2") {
                return (StatusCode::BAD_REQUEST, "unexpected page token").into_response();
            }
            Json(json!({
                "jobComplete": true,
                "jobReference": {"projectId": "aljohnsonex", "jobId": "job_1", "location": "US"},
                "schema": calendar_schema(),
                "rows": [
                    {"f": [{"v": "2025-02-03"}, {"v": "09:30:00"}, {"v": "Departs"}, {"v": null}, {"v": null}]}
                ]
            }))
            .into_response()
        }

        let warehouse = warehouse_at(
            Router::new()
                .route("/projects/:project/queries", post(first_page))
                .route("/projects/:project/queries/:job", get(next_page)),
        )
        .await;

        let events = warehouse.calendar_events().await.unwrap();
        let details: Vec<&str> = events.iter().map(|e| e.details.as_str()).collect();
        assert_eq!(details, vec!["Signs orders", "Briefing", "Departs"]);
    }

    #[tokio::test]
    async fn incomplete_job_is_a_warehouse_error() {
        async fn pending() -> Json<serde_json::Value> {
            Json(json!({
                "jobComplete": false,
                "jobReference": {"projectId": "aljohnsonex", "jobId": "job_2"}
            }))
        }
        let warehouse =
            warehouse_at(Router::new().route("/projects/:project/queries", post(pending))).await;

        let err = warehouse.fetch_table("calendar").await.unwrap_err();
        match err {
            AppError::Warehouse(message) => assert!(message.contains("did not complete")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn upstream_failure_is_a_warehouse_error() {
        async fn broken() -> (StatusCode, &'static str) {
            (StatusCode::INTERNAL_SERVER_ERROR, "backend error")
        }
        let warehouse =
            warehouse_at(Router::new().route("/projects/:project/queries", post(broken))).await;

        let err = warehouse.weekly_summaries().await.unwrap_err();
        match err {
            AppError::Warehouse(message) => {
                assert!(message.contains("500"));
                assert!(message.contains("backend error"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn non_string_cells_keep_their_json_text() {
        let cell: TableCell = serde_json::from_str(r#"{"v": 42}"#).unwrap();
        assert_eq!(cell.into_text().as_deref(), Some("42"));
        let cell: TableCell = serde_json::from_str(r#"{"v": null}"#).unwrap();
        assert_eq!(cell.into_text(), None);
    }
}
