use std::env;

use serde::Deserialize;

use crate::services::timeline::OrdinalStyle;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_BIGQUERY_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub warehouse: WarehouseConfig,
    pub credentials: CredentialsConfig,
    pub dashboard: DashboardConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed to call the JSON API from a browser.
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    pub project_id: String,
    pub dataset_id: String,
    pub region: String,
    pub calendar_table: String,
    pub summary_table: String,
    pub weekly_table: String,
    /// How long the warehouse may hold a `jobs.query` call open before answering.
    pub query_timeout_ms: u64,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CredentialsConfig {
    /// Static service-account key, either inline JSON or a path to the key file.
    ServiceAccount {
        key_json: Option<String>,
        key_file: Option<String>,
    },
    /// OAuth client bundle exchanged for access tokens with a long-lived refresh token.
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_uri: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub title: String,
    pub attribution: String,
    pub calendar_heading: String,
    pub events_heading: String,
    /// Number of most recent distinct dates shown in the calendar column.
    pub calendar_days: usize,
    /// Logo path relative to `static_dir`.
    pub logo_path: String,
    pub static_dir: String,
    pub ordinal_style: OrdinalStyle,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Seconds between quota replenishments for one client IP
    pub per_second: u32,
    /// Requests a client IP may make before replenishment kicks in
    pub burst: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            },
            warehouse: WarehouseConfig {
                project_id: env::var("WAREHOUSE_PROJECT_ID")
                    .unwrap_or_else(|_| "aljohnsonex".to_string()),
                dataset_id: env::var("WAREHOUSE_DATASET_ID")
                    .unwrap_or_else(|_| "TRUMP".to_string()),
                region: env::var("WAREHOUSE_REGION").unwrap_or_else(|_| "us".to_string()),
                calendar_table: env::var("WAREHOUSE_CALENDAR_TABLE")
                    .unwrap_or_else(|_| "calendar".to_string()),
                summary_table: env::var("WAREHOUSE_SUMMARY_TABLE")
                    .unwrap_or_else(|_| "consolidated".to_string()),
                weekly_table: env::var("WAREHOUSE_WEEKLY_TABLE")
                    .unwrap_or_else(|_| "weekly".to_string()),
                query_timeout_ms: env::var("WAREHOUSE_QUERY_TIMEOUT_MS")
                    .unwrap_or_else(|_| "30000".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("WAREHOUSE_QUERY_TIMEOUT_MS".to_string()))?,
                api_url: env::var("WAREHOUSE_API_URL")
                    .unwrap_or_else(|_| DEFAULT_BIGQUERY_API_URL.to_string()),
            },
            credentials: credentials_from_env()?,
            dashboard: DashboardConfig {
                title: env::var("DASHBOARD_TITLE")
                    .unwrap_or_else(|_| "White House Tracker".to_string()),
                attribution: env::var("DASHBOARD_ATTRIBUTION").unwrap_or_else(|_| {
                    "All data collected from www.rollcall.com and www.whitehouse.gov".to_string()
                }),
                calendar_heading: env::var("DASHBOARD_CALENDAR_HEADING")
                    .unwrap_or_else(|_| "Trump Calendar".to_string()),
                events_heading: env::var("DASHBOARD_EVENTS_HEADING")
                    .unwrap_or_else(|_| "Recent Events".to_string()),
                calendar_days: env::var("DASHBOARD_CALENDAR_DAYS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("DASHBOARD_CALENDAR_DAYS".to_string()))?,
                logo_path: env::var("DASHBOARD_LOGO_PATH")
                    .unwrap_or_else(|_| "capitol.svg".to_string()),
                static_dir: env::var("DASHBOARD_STATIC_DIR")
                    .unwrap_or_else(|_| "static".to_string()),
                ordinal_style: match env::var("DASHBOARD_ORDINAL_STYLE") {
                    Ok(v) => parse_ordinal_style(&v)
                        .ok_or_else(|| ConfigError::InvalidValue("DASHBOARD_ORDINAL_STYLE".to_string()))?,
                    Err(_) => OrdinalStyle::Legacy,
                },
            },
            rate_limit: RateLimitConfig {
                per_second: env::var("RATE_LIMIT_PER_SECOND")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                burst: env::var("RATE_LIMIT_BURST")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .unwrap_or(20),
            },
        })
    }
}

fn credentials_from_env() -> Result<CredentialsConfig, ConfigError> {
    let mode = env::var("GCP_AUTH_MODE").unwrap_or_else(|_| "service_account".to_string());

    match parse_auth_mode(&mode) {
        Some(AuthMode::ServiceAccount) => {
            let key_json = env::var("GCP_SERVICE_ACCOUNT_KEY").ok();
            let key_file = env::var("GCP_SERVICE_ACCOUNT_KEY_FILE").ok();
            if key_json.is_none() && key_file.is_none() {
                return Err(ConfigError::MissingEnv(
                    "GCP_SERVICE_ACCOUNT_KEY or GCP_SERVICE_ACCOUNT_KEY_FILE".to_string(),
                ));
            }
            Ok(CredentialsConfig::ServiceAccount { key_json, key_file })
        }
        Some(AuthMode::RefreshToken) => Ok(CredentialsConfig::RefreshToken {
            client_id: env::var("GCP_CLIENT_ID")
                .map_err(|_| ConfigError::MissingEnv("GCP_CLIENT_ID".to_string()))?,
            client_secret: env::var("GCP_CLIENT_SECRET")
                .map_err(|_| ConfigError::MissingEnv("GCP_CLIENT_SECRET".to_string()))?,
            refresh_token: env::var("GCP_REFRESH_TOKEN")
                .map_err(|_| ConfigError::MissingEnv("GCP_REFRESH_TOKEN".to_string()))?,
            token_uri: env::var("GCP_TOKEN_URI").unwrap_or_else(|_| DEFAULT_TOKEN_URI.to_string()),
        }),
        None => Err(ConfigError::InvalidValue("GCP_AUTH_MODE".to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMode {
    ServiceAccount,
    RefreshToken,
}

fn parse_auth_mode(value: &str) -> Option<AuthMode> {
    match value.trim().to_lowercase().replace('-', "_").as_str() {
        "service_account" | "key" => Some(AuthMode::ServiceAccount),
        "refresh_token" | "oauth" => Some(AuthMode::RefreshToken),
        _ => None,
    }
}

fn parse_ordinal_style(value: &str) -> Option<OrdinalStyle> {
    match value.trim().to_lowercase().as_str() {
        "legacy" => Some(OrdinalStyle::Legacy),
        "english" => Some(OrdinalStyle::English),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:8080".to_string(),
            },
            warehouse: WarehouseConfig {
                project_id: "aljohnsonex".to_string(),
                dataset_id: "TRUMP".to_string(),
                region: "us".to_string(),
                calendar_table: "calendar".to_string(),
                summary_table: "consolidated".to_string(),
                weekly_table: "weekly".to_string(),
                query_timeout_ms: 30_000,
                api_url: DEFAULT_BIGQUERY_API_URL.to_string(),
            },
            credentials: CredentialsConfig::ServiceAccount {
                key_json: None,
                key_file: None,
            },
            dashboard: DashboardConfig {
                title: "White House Tracker".to_string(),
                attribution: "All data collected from www.rollcall.com and www.whitehouse.gov"
                    .to_string(),
                calendar_heading: "Trump Calendar".to_string(),
                events_heading: "Recent Events".to_string(),
                calendar_days: 7,
                logo_path: "capitol.svg".to_string(),
                static_dir: "static".to_string(),
                ordinal_style: OrdinalStyle::Legacy,
            },
            rate_limit: RateLimitConfig {
                per_second: 5,
                burst: 20,
            },
        }
    }
}
