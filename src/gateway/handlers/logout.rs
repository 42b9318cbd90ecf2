use axum::{
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};

use crate::gateway::token::clear_cookie;

/// Drop the session cookie in the browser. The token itself stays valid until it expires.
pub async fn logout() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, [(SET_COOKIE, clear_cookie())])
}
