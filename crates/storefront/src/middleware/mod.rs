//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors, bind a hub per request)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with in-memory store: flash notices)
//! 5. Route guard (auth cookie presence on account and login pages)
//! 6. Security headers (CSP, frame options, no-store on pages)

pub mod auth;
pub mod cookie;
pub mod guard;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, login_redirect};
pub use guard::route_guard_middleware;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
