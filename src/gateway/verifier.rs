//! Bearer token verification against a remote IndieAuth token endpoint.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use axum::http::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

const VERIFY_TIMEOUT_SECONDS: u64 = 10;

/// What the token authority says about a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenClaims {
    /// Profile URL of the identity the token was issued to.
    pub me: String,
    pub client_id: Option<String>,
    pub scope: Vec<String>,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no bearer token supplied")]
    MissingToken,
    #[error("token endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("malformed token endpoint response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<TokenClaims, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    me: Option<String>,
    client_id: Option<String>,
    #[serde(default)]
    scope: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

impl ErrorResponse {
    fn message(self) -> Option<String> {
        match (self.error, self.error_description) {
            (Some(error), Some(description)) => Some(format!("{error}: {description}")),
            (None, Some(description)) => Some(description),
            (Some(error), None) => Some(error),
            (None, None) => None,
        }
    }
}

/// Asks the token endpoint about every token, nothing is cached.
#[derive(Clone, Debug)]
pub struct RemoteTokenVerifier {
    client: Client,
    endpoint: Url,
}

impl RemoteTokenVerifier {
    /// # Errors
    /// Returns an error if the endpoint is not an http(s) URL or the client cannot be built.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid token endpoint URL: {endpoint}"))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Token endpoint must use http or https: {endpoint}"
            ));
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(VERIFY_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build token endpoint HTTP client")?;

        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TokenVerifier for RemoteTokenVerifier {
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn verify(&self, token: &str) -> Result<TokenClaims, VerifyError> {
        if token.is_empty() {
            return Err(VerifyError::MissingToken);
        }

        let response = self
            .client
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(VerifyError::Transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(VerifyError::Transport)?;

        if !status.is_success() {
            debug!(%status, "token endpoint rejected token");
            let message = serde_json::from_slice::<ErrorResponse>(&body)
                .ok()
                .and_then(ErrorResponse::message)
                .unwrap_or_else(|| format!("token endpoint returned {status}"));
            return Err(VerifyError::Rejected(message));
        }

        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|err| VerifyError::Malformed(err.to_string()))?;
        let me = parsed
            .me
            .filter(|me| !me.is_empty())
            .ok_or_else(|| VerifyError::Malformed("missing me".to_string()))?;

        Ok(TokenClaims {
            me,
            client_id: parsed.client_id,
            scope: parsed.scope.split_whitespace().map(ToString::to_string).collect(),
        })
    }
}
