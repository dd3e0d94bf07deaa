use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Warehouse error: {0}")]
    Warehouse(String),

    #[error("Invalid row in {table}: {message}")]
    InvalidRow { table: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    pub fn invalid_row(table: &str, message: impl Into<String>) -> Self {
        AppError::InvalidRow {
            table: table.to_string(),
            message: message.into(),
        }
    }

    /// Status and machine-readable code for this error. Logs the underlying cause.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Jwt(e) => {
                tracing::error!("JWT signing error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "CREDENTIALS_ERROR")
            }
            AppError::Credentials(msg) => {
                tracing::error!("Credentials error: {}", msg);
                (StatusCode::BAD_GATEWAY, "CREDENTIALS_ERROR")
            }
            AppError::Request(e) => {
                tracing::error!("HTTP request error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "EXTERNAL_REQUEST_FAILED")
            }
            AppError::Warehouse(msg) => {
                tracing::error!("Warehouse error: {}", msg);
                (StatusCode::BAD_GATEWAY, "WAREHOUSE_ERROR")
            }
            AppError::InvalidRow { table, message } => {
                tracing::error!("Invalid row in {}: {}", table, message);
                (StatusCode::BAD_GATEWAY, "INVALID_ROW")
            }
            AppError::Template(e) => {
                tracing::error!("Template error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "TEMPLATE_ERROR")
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
