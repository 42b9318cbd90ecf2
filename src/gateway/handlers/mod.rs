pub mod admin;
pub use self::admin::admin;

pub mod health;
pub use self::health::health;

pub mod logout;
pub use self::logout::logout;

pub mod micropub;
pub use self::micropub::micropub;

use axum::{
    Router,
    routing::{any, get},
};

/// Stand-in downstream for browser (cookie) access.
pub fn browser_routes() -> Router {
    Router::new()
        .route("/admin", any(admin))
        .route("/admin/{*rest}", any(admin))
}

/// Stand-in downstream for API (bearer token) access.
pub fn api_routes() -> Router {
    Router::new().route("/micropub", get(micropub).post(micropub))
}
