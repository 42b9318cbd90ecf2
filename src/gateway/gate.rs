//! Credential gate for browser routes.
//!
//! Requests with a valid `token` cookie pass straight through. Anything else
//! gets a `401` login page that carries the whole original request in hidden
//! fields, so the login processor can replay it after the operator signs in.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    capture::{CAPTURE_LIMIT, Challenge, ParsedForm, read_bounded},
    state::GatewayState,
};

pub async fn handle(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.issuer().has_valid_session(request.headers()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();

    let body = match read_bounded(body, CAPTURE_LIMIT).await {
        Ok(body) => body,
        Err(err) => {
            // An aborted upload is not a failed login, do not render the form.
            warn!(path = %parts.uri.path(), "request capture aborted: {err}");
            return err.into_response();
        }
    };

    // A layer in front of the gate may already have consumed a form body
    // and left only its parsed values behind.
    let body = if body.is_empty() {
        parts
            .extensions
            .get::<ParsedForm>()
            .map_or(body, |form| Bytes::from(form.encode()))
    } else {
        body
    };

    let action = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);

    debug!(
        method = %parts.method,
        path = %parts.uri.path(),
        body_len = body.len(),
        "no valid session, issuing login challenge"
    );

    let challenge = Challenge::capture(&action, &parts.method, &parts.headers, &body);

    (
        StatusCode::UNAUTHORIZED,
        Html(state.renderer().render(&challenge)),
    )
        .into_response()
}
