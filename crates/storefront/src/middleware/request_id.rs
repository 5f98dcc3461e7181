//! Request correlation ids.
//!
//! Every request carries an id, taken from an upstream proxy's
//! `x-request-id` header when present and generated otherwise. It is stored
//! in the request extensions for the trace span, tagged on the Sentry scope,
//! and echoed back in the response.

use axum::{
    extract::Request,
    http::{HeaderValue, header::HeaderName},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The HTTP header carrying the request id.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest upstream id accepted verbatim.
const MAX_UPSTREAM_ID_LEN: usize = 128;

/// Id of the request being served, available as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    fn from_request(request: &Request) -> Self {
        let upstream = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_UPSTREAM_ID_LEN);
        Self(upstream.map_or_else(|| Uuid::new_v4().to_string(), String::from))
    }
}

/// Middleware that assigns a [`RequestId`] to every request.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_request(&request);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id.0);
    });

    request.extensions_mut().insert(request_id.clone());
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }

    response
}
