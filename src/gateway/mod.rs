use anyhow::Result;
use axum::{
    Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub mod capture;
pub mod config;
pub mod gate;
pub mod handlers;
pub mod indieauth;
pub mod login;
pub mod render;
pub mod state;
pub mod token;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use capture::{CAPTURE_LIMIT, Challenge, ParsedForm, Replay};
pub use config::{GatewayConfig, OwnerCredentials};
pub use indieauth::{GrantedScope, compare_hostnames};
pub use render::{ChallengeRenderer, LoginPage};
pub use state::GatewayState;
pub use token::{IssuedToken, SESSION_COOKIE_NAME, TokenError, TokenIssuer};
pub use verifier::{RemoteTokenVerifier, TokenClaims, TokenVerifier, VerifyError};

/// Put the login processor in front of `inner`.
///
/// `inner` runs as a fallback service so a replayed request is routed again
/// from scratch, with its original method and path.
pub fn with_login_processor(state: Arc<GatewayState>, inner: Router) -> Router {
    Router::new()
        .fallback_service(inner)
        .layer(from_fn_with_state(state, login::handle))
}

/// Assemble the gateway around the downstream routers.
///
/// `browser` routes sit behind the credential gate, `api` routes behind the
/// IndieAuth verifier. `/health` and `/logout` are open.
pub fn router(state: Arc<GatewayState>, browser: Router, api: Router) -> Router {
    let browser = browser.layer(from_fn_with_state(state.clone(), gate::handle));
    let api = api.layer(from_fn_with_state(state.clone(), indieauth::handle));

    let inner = Router::new()
        .route("/health", get(handlers::health))
        .route("/logout", get(handlers::logout).post(handlers::logout))
        .merge(browser)
        .merge(api);

    with_login_processor(state, inner)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<GatewayState>) -> Result<()> {
    let app = router(state, handlers::browser_routes(), handlers::api_routes()).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
