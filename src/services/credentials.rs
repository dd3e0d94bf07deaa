use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::{CredentialsConfig, DEFAULT_TOKEN_URI};
use crate::error::{AppError, AppResult};

pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the issuer-reported expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens for warehouse requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A token valid for at least the refresh margin.
    async fn access_token(&self) -> AppResult<String>;

    fn kind(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Current token shared by concurrent requests.
#[derive(Debug, Clone, Default)]
struct TokenSlot {
    inner: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenSlot {
    async fn fresh(&self) -> Option<String> {
        let guard = self.inner.read().await;
        guard
            .as_ref()
            .filter(|t| t.is_fresh(Utc::now()))
            .map(|t| t.token.clone())
    }

    async fn store(&self, response: TokenResponse) -> AppResult<String> {
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                AppError::Credentials(format!(
                    "Token endpoint returned an invalid expires_in: {}",
                    response.expires_in
                ))
            })?;
        let token = response.access_token;
        let mut guard = self.inner.write().await;
        *guard = Some(AccessToken {
            token: token.clone(),
            expires_at,
        });
        tracing::info!("Refreshed warehouse access token; expires at {}", expires_at);
        Ok(token)
    }
}

fn http_client() -> AppResult<Client> {
    Client::builder()
        .timeout(StdDuration::from_secs(30))
        .build()
        .map_err(|e| AppError::Internal(e.into()))
}

async fn exchange(client: &Client, token_uri: &str, form: &[(&str, &str)]) -> AppResult<TokenResponse> {
    let response = client.post(token_uri).form(form).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(AppError::Credentials(format!(
            "Token endpoint returned {}: {}",
            status, error_text
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| AppError::Credentials(format!("Failed to parse token response: {}", e)))
}

// ============================================================================
// Service account
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Credentials(format!("Invalid service account key: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

pub struct ServiceAccountProvider {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    slot: TokenSlot,
}

impl ServiceAccountProvider {
    pub fn new(key: ServiceAccountKey) -> AppResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            client: http_client()?,
            key,
            encoding_key,
            slot: TokenSlot::default(),
        })
    }

    /// Signed JWT asserting the service account's identity to the token endpoint.
    fn assertion(&self, now: DateTime<Utc>) -> AppResult<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: BIGQUERY_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        Ok(encode(&header, &claims, &self.encoding_key)?)
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountProvider {
    async fn access_token(&self) -> AppResult<String> {
        if let Some(token) = self.slot.fresh().await {
            return Ok(token);
        }

        let assertion = self.assertion(Utc::now())?;
        let response = exchange(
            &self.client,
            &self.key.token_uri,
            &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
        )
        .await?;

        self.slot.store(response).await
    }

    fn kind(&self) -> &'static str {
        "service_account"
    }
}

// ============================================================================
// Refresh token
// ============================================================================

pub struct RefreshTokenProvider {
    client: Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_uri: String,
    slot: TokenSlot,
}

impl RefreshTokenProvider {
    pub fn new(
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_uri: String,
    ) -> AppResult<Self> {
        Ok(Self {
            client: http_client()?,
            client_id,
            client_secret,
            refresh_token,
            token_uri,
            slot: TokenSlot::default(),
        })
    }
}

#[async_trait]
impl CredentialProvider for RefreshTokenProvider {
    async fn access_token(&self) -> AppResult<String> {
        if let Some(token) = self.slot.fresh().await {
            return Ok(token);
        }

        let response = exchange(
            &self.client,
            &self.token_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ],
        )
        .await?;

        self.slot.store(response).await
    }

    fn kind(&self) -> &'static str {
        "refresh_token"
    }
}

/// Build the provider selected by configuration.
pub fn provider_from_config(config: &CredentialsConfig) -> AppResult<Arc<dyn CredentialProvider>> {
    match config {
        CredentialsConfig::ServiceAccount { key_json, key_file } => {
            let raw = match (key_json, key_file) {
                (Some(json), _) => json.clone(),
                (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Failed to read service account key {}: {}", path, e))
                })?,
                (None, None) => {
                    return Err(AppError::Config(
                        "No service account key configured".to_string(),
                    ))
                }
            };
            let key = ServiceAccountKey::from_json(&raw)?;
            tracing::info!(
                "Using service account {} (project {})",
                key.client_email,
                key.project_id.as_deref().unwrap_or("unknown")
            );
            Ok(Arc::new(ServiceAccountProvider::new(key)?))
        }
        CredentialsConfig::RefreshToken {
            client_id,
            client_secret,
            refresh_token,
            token_uri,
        } => {
            tracing::info!("Using OAuth refresh-token credentials");
            Ok(Arc::new(RefreshTokenProvider::new(
                client_id.clone(),
                client_secret.clone(),
                refresh_token.clone(),
                token_uri.clone(),
            )?))
        }
    }
}
