//! Login processor: turns a submitted challenge back into the original request.
//!
//! A submission is a form-urlencoded `POST` with `loginaction=login`. The
//! original request is rebuilt from the hidden fields and always forwarded
//! downstream. With the right credentials it carries a fresh session cookie,
//! which is also set on the response. With the wrong ones it goes on bare
//! and the credential gate will simply challenge again.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{
    capture::{CAPTURE_LIMIT, ParsedForm, Replay, read_bounded},
    state::GatewayState,
    token::IssuedToken,
};

/// Base64 inflates the captured body by a third; leave room for the other fields.
pub const LOGIN_FORM_LIMIT: usize = CAPTURE_LIMIT * 2;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Outcome of inspecting an inbound request.
#[derive(Debug)]
pub enum Submission {
    /// A login form post, with its fields parsed.
    Login { parts: Parts, form: ParsedForm },
    /// Anything else, handed back untouched apart from a buffered body.
    PassThrough(Request),
}

fn is_form_post(method: &Method, headers: &HeaderMap) -> bool {
    if method != Method::POST {
        return false;
    }
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(FORM_URLENCODED))
}

/// Decide whether `request` is a login submission.
///
/// # Errors
/// Returns a ready response if the form body cannot be read or is too large.
pub async fn recognize(request: Request) -> Result<Submission, Response> {
    if !is_form_post(request.method(), request.headers()) {
        return Ok(Submission::PassThrough(request));
    }

    let (mut parts, body) = request.into_parts();
    let bytes = match read_bounded(body, LOGIN_FORM_LIMIT + 1).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(path = %parts.uri.path(), "form read aborted: {err}");
            return Err(err.into_response());
        }
    };
    if bytes.len() > LOGIN_FORM_LIMIT {
        return Err((StatusCode::PAYLOAD_TOO_LARGE, "form body too large").into_response());
    }

    let form = ParsedForm::parse(&bytes);
    if form.get("loginaction") == Some("login") {
        return Ok(Submission::Login { parts, form });
    }

    parts.extensions.insert(form);
    Ok(Submission::PassThrough(Request::from_parts(
        parts,
        Body::from(bytes),
    )))
}

/// Rebuild the original request from the hidden fields of `form`.
///
/// The target is the path the form was posted to, which is the path the
/// challenge was issued for.
#[must_use]
pub fn reconstruct(parts: &Parts, form: &ParsedForm) -> Request {
    let replay = Replay::decode(
        form.get("loginmethod").unwrap_or_default(),
        form.get("loginheaders").unwrap_or_default(),
        form.get("loginbody").unwrap_or_default(),
    );

    let mut request = Request::new(Body::from(replay.body));
    *request.method_mut() = replay.method;
    *request.uri_mut() = parts.uri.clone();
    *request.version_mut() = parts.version;
    *request.headers_mut() = replay.headers;
    request
}

/// Fold every `Cookie` header of the rebuilt request and the session pair into one header.
///
/// Values are joined as raw bytes, so crumbs split across headers and
/// non-UTF-8 cookies all survive.
fn attach_cookie(request: &mut Request, issued: &IssuedToken) -> Result<(), Response> {
    let mut combined = Vec::new();
    for existing in request.headers().get_all(COOKIE) {
        let existing = existing.as_bytes().trim_ascii();
        if existing.is_empty() {
            continue;
        }
        combined.extend_from_slice(existing);
        combined.extend_from_slice(b"; ");
    }
    combined.extend_from_slice(issued.cookie_pair().as_bytes());

    let value = HeaderValue::from_bytes(&combined).map_err(|err| {
        error!("failed to attach session cookie: {err}");
        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
    })?;
    request.headers_mut().insert(COOKIE, value);
    Ok(())
}

/// Check credentials, replay the original request and hand back the downstream response.
async fn replay(state: &GatewayState, parts: Parts, form: ParsedForm, next: Next) -> Response {
    let mut request = reconstruct(&parts, &form);

    let username = form.get("username").unwrap_or_default();
    let password = form.get("password").unwrap_or_default();

    let issued = if state.config().owner().matches(username, password) {
        let issued = match state.issuer().issue() {
            Ok(issued) => issued,
            Err(err) => {
                error!("failed to issue session token: {err}");
                return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
            }
        };
        let set_cookie = match issued.set_cookie_header() {
            Ok(value) => value,
            Err(err) => {
                error!("failed to build session cookie: {err}");
                return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
            }
        };
        if let Err(response) = attach_cookie(&mut request, &issued) {
            return response;
        }
        debug!(method = %request.method(), path = %parts.uri.path(), "login accepted, replaying request");
        Some(set_cookie)
    } else {
        debug!(method = %request.method(), path = %parts.uri.path(), "login rejected, replaying without session");
        None
    };

    let mut response = next.run(request).await;
    if let Some(set_cookie) = issued {
        response.headers_mut().append(SET_COOKIE, set_cookie);
    }
    response
}

pub async fn handle(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    match recognize(request).await {
        Ok(Submission::Login { parts, form }) => replay(&state, parts, form, next).await,
        Ok(Submission::PassThrough(request)) => next.run(request).await,
        Err(response) => response,
    }
}
