use axum::{
    body::Bytes,
    http::{Method, Uri},
    response::{IntoResponse, Json},
};
use serde_json::json;

/// Echo what reached the protected area.
pub async fn admin(method: Method, uri: Uri, body: Bytes) -> impl IntoResponse {
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "body_len": body.len(),
    }))
}
