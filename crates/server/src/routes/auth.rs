//! Admin login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Datelike;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::set_sentry_user;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::routes::home::MessageQuery;
use crate::routes::message_for;
use crate::state::AppState;

const ERROR_MESSAGES: &[(&str, &str)] = &[(
    "session",
    "Die Anmeldung konnte nicht gespeichert werden. Bitte erneut versuchen.",
)];

const SUCCESS_MESSAGES: &[(&str, &str)] = &[("logged_out", "Du bist abgemeldet.")];

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub username: String,
    pub error: Option<String>,
    pub success: Option<String>,
    pub year: i32,
}

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAdminAuth(admin): OptionalAdminAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if admin.is_some() {
        return Redirect::to("/admin").into_response();
    }

    LoginTemplate {
        username: String::new(),
        error: message_for(query.error.as_deref(), ERROR_MESSAGES),
        success: message_for(query.success.as_deref(), SUCCESS_MESSAGES),
        year: state.today().year(),
    }
    .into_response()
}

/// Handle login form submission.
///
/// Wrong credentials re-render the form with status 401.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    if !state.credentials().verify(&form.username, &form.password) {
        tracing::warn!("Admin login failed");
        let page = LoginTemplate {
            username: form.username,
            error: Some("Benutzername oder Passwort ist falsch.".to_string()),
            success: None,
            year: state.today().year(),
        };
        return (StatusCode::UNAUTHORIZED, page).into_response();
    }

    let admin = CurrentAdmin {
        username: form.username,
    };
    if let Err(e) = set_current_admin(&session, &admin).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to("/admin/login?error=session").into_response();
    }

    set_sentry_user(&admin.username);
    tracing::info!("Admin logged in");
    Redirect::to("/admin").into_response()
}

/// Log the admin out.
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    Redirect::to("/admin/login?success=logged_out")
}
