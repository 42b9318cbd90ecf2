use axum::{
    extract::Extension,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::gateway::GrantedScope;

/// Report the scope the bearer token was granted.
pub async fn micropub(Extension(scope): Extension<GrantedScope>) -> impl IntoResponse {
    Json(json!({
        "scope": scope.as_str(),
        "create": scope.contains("create"),
    }))
}
