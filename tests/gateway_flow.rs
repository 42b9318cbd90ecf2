//! End-to-end behaviour of the composed gateway router.
//!
//! Drives the same router the binary serves through the browser
//! challenge/replay cycle and the IndieAuth bearer path, without a socket.

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
    response::Response,
};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use url::form_urlencoded;
use vestibule::gateway::{
    self, GatewayConfig, GatewayState, LoginPage, OwnerCredentials, TokenClaims, TokenVerifier,
    VerifyError, handlers,
};

const DOMAIN: &str = "blog.example";
const USERNAME: &str = "admin";
const PASSWORD: &str = "correct horse";

struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<TokenClaims, VerifyError> {
        match token {
            "owner-token" => Ok(TokenClaims {
                me: "https://blog.example/".to_string(),
                client_id: Some("https://quill.example/".to_string()),
                scope: vec!["create".to_string(), "media".to_string()],
            }),
            "guest-token" => Ok(TokenClaims {
                me: "https://guest.example/".to_string(),
                client_id: None,
                scope: vec!["create".to_string()],
            }),
            _ => Err(VerifyError::Rejected(
                "invalid_token: The token provided was malformed".to_string(),
            )),
        }
    }
}

fn app() -> Router {
    let config = GatewayConfig::new(
        DOMAIN.to_string(),
        SecretString::from("integration-secret".to_string()),
        OwnerCredentials::new(USERNAME.to_string(), SecretString::from(PASSWORD.to_string())),
    );
    let state = Arc::new(GatewayState::new(
        config,
        Arc::new(LoginPage),
        Arc::new(StaticVerifier),
    ));
    gateway::router(state, handlers::browser_routes(), handlers::api_routes())
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn field(html: &str, name: &str) -> Result<String> {
    let marker = format!(r#"name="{name}" value=""#);
    let start = html
        .find(&marker)
        .with_context(|| format!("field {name} not in login page"))?
        + marker.len();
    let end = html[start..]
        .find('"')
        .context("unterminated attribute")?
        + start;
    Ok(html[start..end].to_string())
}

fn login_form(html: &str, password: &str) -> Result<String> {
    Ok(form_urlencoded::Serializer::new(String::new())
        .append_pair("loginaction", &field(html, "loginaction")?)
        .append_pair("loginmethod", &field(html, "loginmethod")?)
        .append_pair("loginheaders", &field(html, "loginheaders")?)
        .append_pair("loginbody", &field(html, "loginbody")?)
        .append_pair("username", USERNAME)
        .append_pair("password", password)
        .finish())
}

fn submit(uri: &str, form: String) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))?)
}

/// `token=<jwt>` from a `Set-Cookie` header.
fn session_pair(response: &Response) -> Result<String> {
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("no Set-Cookie header")?
        .to_str()?;
    let pair = set_cookie
        .split(';')
        .next()
        .context("empty Set-Cookie header")?;
    Ok(pair.to_string())
}

#[tokio::test]
async fn browser_login_replays_and_sets_session() -> Result<()> {
    let app = app();

    let response = app
        .clone()
        .oneshot(Request::get("/admin/posts?draft=1").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let html = body_text(response).await?;
    assert!(html.contains(r#"action="/admin/posts?draft=1""#));
    assert_eq!(field(&html, "loginmethod")?, "GET");

    let response = app
        .clone()
        .oneshot(submit("/admin/posts?draft=1", login_form(&html, PASSWORD)?)?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_pair(&response)?;
    assert!(cookie.starts_with("token="));
    let echoed: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["path"], "/admin/posts");
    assert_eq!(echoed["body_len"], 0);

    let response = app
        .oneshot(
            Request::get("/admin")
                .header(COOKIE, cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());

    Ok(())
}

#[tokio::test]
async fn captured_post_is_replayed_with_its_body() -> Result<()> {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/admin/posts/42")
                .header(CONTENT_TYPE, "text/plain")
                .body(Body::from("updated body"))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let html = body_text(response).await?;

    let response = app
        .oneshot(submit("/admin/posts/42", login_form(&html, PASSWORD)?)?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_some());
    let echoed: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["path"], "/admin/posts/42");
    assert_eq!(echoed["body_len"], "updated body".len());

    Ok(())
}

#[tokio::test]
async fn wrong_password_is_challenged_again() -> Result<()> {
    let app = app();

    let response = app
        .clone()
        .oneshot(Request::get("/admin").body(Body::empty())?)
        .await?;
    let html = body_text(response).await?;

    let response = app
        .oneshot(submit("/admin", login_form(&html, "wrong")?)?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let html = body_text(response).await?;
    assert_eq!(field(&html, "loginmethod")?, "GET");

    Ok(())
}

#[tokio::test]
async fn micropub_requires_owner_bearer_token() -> Result<()> {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::post("/micropub")
                .header(AUTHORIZATION, "Bearer owner-token")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let granted: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(granted["scope"], "create media");
    assert_eq!(granted["create"], true);

    let response = app
        .clone()
        .oneshot(Request::get("/micropub?q=config&access_token=owner-token").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::post("/micropub")
                .header(AUTHORIZATION, "Bearer guest-token")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await?, "Forbidden");

    let response = app
        .oneshot(
            Request::post("/micropub")
                .header(AUTHORIZATION, "Bearer bogus")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_text(response).await?,
        "invalid_token: The token provided was malformed"
    );

    Ok(())
}

#[tokio::test]
async fn session_cookie_does_not_open_micropub() -> Result<()> {
    let app = app();

    let response = app
        .clone()
        .oneshot(Request::get("/admin").body(Body::empty())?)
        .await?;
    let html = body_text(response).await?;
    let response = app
        .clone()
        .oneshot(submit("/admin", login_form(&html, PASSWORD)?)?)
        .await?;
    let cookie = session_pair(&response)?;

    let response = app
        .oneshot(
            Request::post("/micropub")
                .header(COOKIE, cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn health_and_logout_are_open() -> Result<()> {
    let app = app();

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-App").is_some());
    let health: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(health["name"], env!("CARGO_PKG_NAME"));

    let response = app
        .oneshot(Request::post("/logout").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response
        .headers()
        .get(SET_COOKIE)
        .context("logout must clear the cookie")?
        .to_str()?;
    assert!(cleared.starts_with("token=;"));
    assert!(cleared.contains("Max-Age=0"));

    Ok(())
}
