//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Security headers
//! 4. Session layer (tower-sessions with `SQLite` store)
//! 5. Rate limiting (login only)

pub mod auth;
pub mod rate_limit;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin};
pub use rate_limit::login_rate_limiter;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
