//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Signup form and roster summary
//! POST /signup                     - Register a participant
//! GET  /signup/{name}/withdraw     - Withdrawal confirmation
//! POST /signup/{name}/withdraw     - Withdraw a signup
//!
//! GET  /admin/login                - Login form
//! POST /admin/login                - Login (rate limited)
//! POST /admin/logout               - Logout
//! GET  /admin                      - Roster, schedule and notification controls
//! POST /admin/override-date        - Move or restore the next date
//! POST /admin/cancel-next          - Cancel or reinstate the next brunch
//! POST /admin/notify               - Page the roster summary via DAPNET
//! POST /admin/reset                - Clear the roster now
//!
//! GET  /health                     - Liveness
//! GET  /health/ready               - Readiness (database)
//! GET  /static/*                   - Stylesheet
//! ```

pub mod admin;
pub mod auth;
pub mod health;
pub mod home;
pub mod signup;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;

use crate::middleware::{login_rate_limiter, security_headers_middleware};
use crate::state::AppState;

/// Build the application router with all middleware applied.
pub fn app(state: AppState, session_layer: SessionManagerLayer<SqliteStore>) -> Router {
    let static_dir = state.config().static_dir.clone();

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(session_layer)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Build the page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .merge(signup_routes())
        .merge(admin_routes())
}

/// Participant signup routes.
fn signup_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup::create))
        .route(
            "/signup/{name}/withdraw",
            get(signup::withdraw_page).post(signup::withdraw),
        )
}

/// Admin routes.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/login",
            get(auth::login_page)
                .post(auth::login)
                .layer(login_rate_limiter()),
        )
        .route("/admin/logout", post(auth::logout))
        .route("/admin", get(admin::dashboard))
        .route("/admin/override-date", post(admin::set_override_date))
        .route("/admin/cancel-next", post(admin::set_cancelled))
        .route("/admin/notify", post(admin::notify))
        .route("/admin/reset", post(admin::reset_roster))
}

/// Look up the user-facing text for a message code from a query string.
///
/// Unknown codes yield `None` so arbitrary query text is never displayed.
pub(crate) fn message_for(code: Option<&str>, messages: &[(&str, &str)]) -> Option<String> {
    let code = code?;
    messages
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, text)| (*text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_for() {
        let messages = [("signed_up", "Danke!")];
        assert_eq!(
            message_for(Some("signed_up"), &messages).as_deref(),
            Some("Danke!")
        );
        assert_eq!(message_for(Some("<script>"), &messages), None);
        assert_eq!(message_for(None, &messages), None);
    }
}
