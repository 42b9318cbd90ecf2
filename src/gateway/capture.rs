//! Lossless capture of an intercepted request and its reconstruction.
//!
//! Headers are serialized as a JSON object of `name -> [values]` and
//! base64-encoded together with the raw body, so the browser can carry the
//! request through the login form and hand it back unchanged.

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use base64ct::{Base64, Encoding};
use futures::StreamExt;
use std::collections::BTreeMap;
use thiserror::Error;
use url::form_urlencoded;

/// Hard ceiling on captured body bytes.
pub const CAPTURE_LIMIT: usize = 20_000_000;

/// Header set as serialized into the challenge.
pub type HeaderSnapshot = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Form values some earlier layer already pulled out of the body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedForm(pub Vec<(String, String)>);

impl ParsedForm {
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        Self(form_urlencoded::parse(bytes).into_owned().collect())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Re-encode as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.0)
            .finish()
    }
}

/// Read at most `limit` bytes of `body`, silently dropping the rest.
///
/// # Errors
/// Returns an error if the underlying stream fails, e.g. the client went away.
pub async fn read_bounded(body: Body, limit: usize) -> Result<Bytes, CaptureError> {
    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();

    while buffer.len() < limit {
        let Some(chunk) = stream.next().await else {
            break;
        };
        let chunk = chunk.map_err(CaptureError::Body)?;
        let room = limit - buffer.len();
        buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    Ok(Bytes::from(buffer))
}

#[must_use]
pub fn snapshot_headers(headers: &HeaderMap) -> HeaderSnapshot {
    let mut snapshot = HeaderSnapshot::new();
    for (name, value) in headers {
        snapshot
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    snapshot
}

/// Rebuild a header map, skipping names or values `http` refuses.
#[must_use]
pub fn restore_headers(snapshot: &HeaderSnapshot) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, values) in snapshot {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        for value in values {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.append(name.clone(), value);
            }
        }
    }
    headers
}

/// The encoded form of an intercepted request, ready to be rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    /// Path and query the login form must be posted back to.
    pub action: String,
    pub method: String,
    pub headers: String,
    pub body: String,
}

impl Challenge {
    #[must_use]
    pub fn capture(action: &str, method: &Method, headers: &HeaderMap, body: &[u8]) -> Self {
        // A BTreeMap of strings always serializes.
        let headers_json = serde_json::to_vec(&snapshot_headers(headers)).unwrap_or_default();

        Self {
            action: action.to_string(),
            method: method.as_str().to_string(),
            headers: Base64::encode_string(&headers_json),
            body: Base64::encode_string(body),
        }
    }
}

/// A request decoded from a submitted challenge.
#[derive(Debug)]
pub struct Replay {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Replay {
    /// Decode the hidden login fields.
    ///
    /// Nothing here fails: an unusable method becomes `GET`, undecodable
    /// headers become an empty map and an undecodable body becomes empty.
    #[must_use]
    pub fn decode(method: &str, headers: &str, body: &str) -> Self {
        let method = if method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(method.as_bytes()).unwrap_or(Method::GET)
        };

        let headers = Base64::decode_vec(headers.trim())
            .ok()
            .and_then(|json| serde_json::from_slice::<HeaderSnapshot>(&json).ok())
            .map(|snapshot| restore_headers(&snapshot))
            .unwrap_or_default();

        let body = Base64::decode_vec(body.trim())
            .map(Bytes::from)
            .unwrap_or_default();

        Self {
            method,
            headers,
            body,
        }
    }
}
