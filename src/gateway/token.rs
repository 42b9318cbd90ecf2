//! Session token issuance and verification.
//!
//! A session token is an HS256 JWT whose only claim is `exp`. It travels in
//! the `token` cookie.

use axum::http::{HeaderMap, HeaderValue, header::COOKIE, header::InvalidHeaderValue};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SESSION_COOKIE_NAME: &str = "token";

/// Seven days.
pub const SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no session secret configured")]
    MissingSecret,
    #[error("failed to sign session token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("invalid session token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("session token expired")]
    Expired,
    #[error("invalid cookie value")]
    Cookie(#[from] InvalidHeaderValue),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub exp: i64,
}

/// A freshly minted token together with its cookie form.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl IssuedToken {
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `name=value` pair for a request `Cookie` header.
    #[must_use]
    pub fn cookie_pair(&self) -> String {
        format!("{SESSION_COOKIE_NAME}={}", self.token)
    }

    /// Full `Set-Cookie` value.
    #[must_use]
    pub fn set_cookie(&self) -> String {
        format!(
            "{}; Path=/; Expires={}; Secure; HttpOnly; SameSite=Strict",
            self.cookie_pair(),
            self.expires_at.format(COOKIE_DATE_FORMAT)
        )
    }

    /// # Errors
    /// Returns an error if the token contains bytes not allowed in a header.
    pub fn set_cookie_header(&self) -> Result<HeaderValue, TokenError> {
        Ok(HeaderValue::from_str(&self.set_cookie())?)
    }
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
#[must_use]
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("token=; Path=/; Max-Age=0; Secure; HttpOnly; SameSite=Strict")
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    configured: bool,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            configured: !secret.is_empty(),
        }
    }

    /// Mint a token that expires seven days from now.
    ///
    /// # Errors
    /// Returns an error if no secret is configured or signing fails.
    pub fn issue(&self) -> Result<IssuedToken, TokenError> {
        self.issue_at(Utc::now())
    }

    /// # Errors
    /// Returns an error if no secret is configured or signing fails.
    pub fn issue_at(&self, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        if !self.configured {
            return Err(TokenError::MissingSecret);
        }

        // Cookie dates have second precision, keep the claim identical.
        let expires_at = DateTime::from_timestamp(
            (now + Duration::seconds(SESSION_TTL_SECONDS)).timestamp(),
            0,
        )
        .unwrap_or(now);
        let claims = SessionClaims {
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// # Errors
    /// Returns an error if the signature is wrong, the token is malformed or it has expired.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// A token is valid strictly before its `exp`; at `exp` it is already expired.
    ///
    /// # Errors
    /// Returns an error if the signature is wrong, the token is malformed or it has expired.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        if !self.configured {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(TokenError::Invalid)?
            .claims;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// True if any `token` cookie on the request verifies.
    #[must_use]
    pub fn has_valid_session(&self, headers: &HeaderMap) -> bool {
        session_cookies(headers).any(|token| self.verify(token).is_ok())
    }
}

/// Every `token` cookie value across all `Cookie` headers, in order.
pub fn session_cookies(headers: &HeaderMap) -> impl Iterator<Item = &str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME).then(|| val.trim())
        })
}
