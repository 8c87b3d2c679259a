//! API layer - HTTP handlers and routing
//!
//! Routes:
//! - `GET /` welcome text
//! - `/posts` create, list, get, update and delete posts

pub mod common;
pub mod posts;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use common::{ApiError, AppState};

/// Welcome text served at the root path
pub const WELCOME_MESSAGE: &str = "Welcome to the blogging platform!";

async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

/// Build the API routes without middleware
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .nest("/posts", posts::router())
}

/// Build the complete router with middleware
///
/// # Errors
///
/// Returns an error if `cors_origin` is not a valid header value.
pub fn build_router(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(build_api_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
