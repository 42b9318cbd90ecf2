//! Delegated (IndieAuth) authorization for API routes.
//!
//! The bearer token is checked by the configured [`TokenVerifier`] on every
//! request. Its `me` URL must live on this server's domain; the granted scope
//! is then attached as a [`GrantedScope`] extension.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use url::{Url, form_urlencoded};

use super::{state::GatewayState, verifier::VerifyError};

/// Space-joined scope granted to the bearer token of the current request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrantedScope(String);

impl GrantedScope {
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.0.split_whitespace().any(|granted| granted == permission)
    }
}

#[derive(Debug, Error)]
pub enum HostnameError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("hostnames do not match, {url} is not {allowed}")]
    Mismatch { url: String, allowed: String },
}

/// Exact, case-insensitive hostname match of `url` against `allowed`.
///
/// # Errors
/// Returns an error if `url` does not parse or its host differs from `allowed`.
pub fn compare_hostnames(url: &str, allowed: &str) -> Result<(), HostnameError> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .unwrap_or_default()
        .trim_start_matches('[')
        .trim_end_matches(']');

    if host.eq_ignore_ascii_case(allowed) {
        Ok(())
    } else {
        Err(HostnameError::Mismatch {
            url: parsed.to_string(),
            allowed: allowed.to_string(),
        })
    }
}

/// Bearer token from `Authorization`, else from the `access_token` query parameter.
#[must_use]
pub fn bearer_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty())
        .map(ToString::to_string);

    from_header.or_else(|| {
        let query = request.uri().query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "access_token")
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty())
    })
}

pub async fn handle(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return (StatusCode::UNAUTHORIZED, VerifyError::MissingToken.to_string()).into_response();
    };

    let claims = match state.verifier().verify(&token).await {
        Ok(claims) => claims,
        Err(err) => {
            warn!(path = %request.uri().path(), "bearer token verification failed: {err}");
            // The authority's message is passed through to the client as-is.
            return (StatusCode::UNAUTHORIZED, err.to_string()).into_response();
        }
    };

    if let Err(err) = compare_hostnames(&claims.me, state.config().domain()) {
        debug!("delegated identity refused: {err}");
        return (StatusCode::UNAUTHORIZED, "Forbidden").into_response();
    }

    let scope = GrantedScope::new(claims.scope.join(" "));
    debug!(me = %claims.me, scope = scope.as_str(), "delegated identity accepted");
    request.extensions_mut().insert(scope);

    next.run(request).await
}
