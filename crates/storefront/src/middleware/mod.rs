//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and referrer policy)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting (governor, on login, register and contact POSTs only)
//!
//! Authentication is not a layer: handlers opt in through the
//! [`RequireAuth`], [`RequireStaff`] and [`OptionalAuth`] extractors.

pub mod auth;
pub mod page_context;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, RequireStaff, clear_current_user, is_local_path, login_url,
    set_current_user,
};
pub use page_context::PageContext;
pub use rate_limit::{ClientIp, form_rate_limiter, login_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
