//! Aether Market storefront library.
//!
//! Server-rendered storefront for the Aether Market shop API: catalogue
//! browsing, a cookie-backed cart, checkout, order history and account pages.
//! The binary in `main.rs` only loads configuration, sets up tracing and
//! Sentry, and serves [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn, routing::get};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::Span;

use crate::middleware::request_id::RequestId;
use crate::state::AppState;

/// Directory served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the complete storefront router with its middleware stack.
///
/// See [`middleware`] for the layer order.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(from_fn(middleware::route_guard_middleware))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(from_fn(middleware::request_id_middleware))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the shop API.
async fn health() -> &'static str {
    "ok"
}

/// Span for one request, tagged with its request id.
fn request_span(request: &Request) -> Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map_or("-", |id| id.0.as_str());
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}
