//! Admin dashboard: roster, schedule controls and notification.
//!
//! Every handler requires a logged-in admin via [`RequireAdminAuth`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::instrument;

use brunch_core::{ScheduleError, german_weekday};

use crate::error::AppError;
use crate::middleware::RequireAdminAuth;
use crate::models::CurrentAdmin;
use crate::routes::home::EventView;
use crate::routes::message_for;
use crate::services::{NotificationError, ResolverError, describe_participation, mailto_link};
use crate::state::AppState;

const SUCCESS_MESSAGES: &[(&str, &str)] = &[
    ("override_set", "Der Termin wurde verschoben."),
    ("override_cleared", "Es gilt wieder der reguläre Termin."),
    ("cancelled", "Der nächste Brunch ist abgesagt."),
    ("reinstated", "Der nächste Brunch findet statt."),
    ("notified", "Die Pager-Nachricht wurde gesendet."),
    ("reset", "Die Anmeldeliste wurde geleert."),
];

const WARNING_MESSAGES: &[(&str, &str)] = &[
    (
        "paging_failed",
        "Die Pager-Nachricht konnte nicht gesendet werden.",
    ),
    (
        "paging_disabled",
        "Der Pager ist nicht eingerichtet (DAPNET-Zugang oder Rufzeichen fehlen).",
    ),
];

// =============================================================================
// Form and Query Types
// =============================================================================

/// Query parameters for message display.
#[derive(Debug, Default, Deserialize)]
pub struct AdminMessageQuery {
    pub success: Option<String>,
    pub warning: Option<String>,
}

/// Override form data; an empty date restores the regular schedule.
#[derive(Debug, Deserialize)]
pub struct OverrideForm {
    #[serde(default)]
    pub date: String,
}

/// Cancellation form data.
#[derive(Debug, Deserialize)]
pub struct CancelForm {
    pub cancelled: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// One roster line in the admin table.
#[derive(Debug, Clone)]
pub struct RosterRow {
    pub name: String,
    pub item: String,
    pub coffee_only: bool,
}

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct DashboardTemplate {
    pub admin: String,
    pub event: EventView,
    /// Current override as `YYYY-MM-DD`, empty without one.
    pub override_date: String,
    pub reset_time: String,
    pub signups: Vec<RosterRow>,
    pub roll_count: usize,
    pub coffee_count: usize,
    pub mailto: String,
    pub recipients: String,
    pub paging_enabled: bool,
    pub error: Option<String>,
    pub warning: Option<String>,
    pub success: Option<String>,
    pub year: i32,
}

/// Messages for the dashboard.
#[derive(Debug, Default)]
struct Flash {
    error: Option<String>,
    warning: Option<String>,
    success: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the admin dashboard.
#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<AdminMessageQuery>,
) -> Result<DashboardTemplate, AppError> {
    let flash = Flash {
        error: None,
        warning: message_for(query.warning.as_deref(), WARNING_MESSAGES),
        success: message_for(query.success.as_deref(), SUCCESS_MESSAGES),
    };
    render_dashboard(&state, &admin, flash).await
}

/// Move the next brunch to another date, or restore the regular date.
#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn set_override_date(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Form(form): Form<OverrideForm>,
) -> Result<Response, AppError> {
    let today = state.today();
    let raw = form.date.trim();

    if raw.is_empty() {
        state.resolver().clear_override(today).await?;
        tracing::info!("Override date cleared");
        return Ok(Redirect::to("/admin?success=override_cleared").into_response());
    }

    let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
        return rejected(&state, &admin, "Bitte ein gültiges Datum angeben.".to_string()).await;
    };

    match state.resolver().set_override(date, today).await {
        Ok(_) => {
            tracing::info!(%date, "Override date set");
            Ok(Redirect::to("/admin?success=override_set").into_response())
        }
        Err(ResolverError::Schedule(e)) => rejected(&state, &admin, schedule_message(&e)).await,
        Err(e) => Err(e.into()),
    }
}

/// Cancel or reinstate the next brunch.
#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn set_cancelled(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Form(form): Form<CancelForm>,
) -> Result<Redirect, AppError> {
    let resolution = state
        .resolver()
        .set_cancelled(form.cancelled, state.today())
        .await?;
    tracing::info!(date = %resolution.date(), cancelled = form.cancelled, "Cancellation changed");

    Ok(Redirect::to(if form.cancelled {
        "/admin?success=cancelled"
    } else {
        "/admin?success=reinstated"
    }))
}

/// Page the roster summary through DAPNET.
///
/// A failed page only shows a warning; the roster is never touched.
#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn notify(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Redirect, AppError> {
    let resolution = state.resolver().resolve_next_event(state.today()).await?;
    let signups = state.roster().list_signups().await?;
    let notification = state.notifier().build(&signups, &resolution);

    let target = match state.notifier().page(&notification).await {
        Ok(()) => "/admin?success=notified",
        Err(e @ (NotificationError::NotConfigured | NotificationError::NoRecipients)) => {
            tracing::warn!(error = %e, "Paging requested but not set up");
            "/admin?warning=paging_disabled"
        }
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::warn!(
                error = %e,
                sentry_event_id = %event_id,
                "DAPNET page failed"
            );
            "/admin?warning=paging_failed"
        }
    };
    Ok(Redirect::to(target))
}

/// Clear the roster immediately.
#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn reset_roster(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Redirect, AppError> {
    let removed = state.roster().clear().await?;
    tracing::info!(removed, "Roster reset by admin");
    Ok(Redirect::to("/admin?success=reset"))
}

// =============================================================================
// Helpers
// =============================================================================

async fn render_dashboard(
    state: &AppState,
    admin: &CurrentAdmin,
    flash: Flash,
) -> Result<DashboardTemplate, AppError> {
    let today = state.today();
    let resolution = state.resolver().resolve_next_event(today).await?;
    let schedule = state.resolver().snapshot().await;
    let signups = state.roster().list_signups().await?;

    let notification = state.notifier().build(&signups, &resolution);
    let roll_count = brunch_core::required_roll_count(&signups);
    let coffee_count = signups.len() - roll_count;

    let rows = signups
        .iter()
        .map(|signup| RosterRow {
            name: signup.name.to_string(),
            item: if signup.participation.is_coffee_only() {
                String::new()
            } else {
                describe_participation(&signup.participation)
            },
            coffee_only: signup.participation.is_coffee_only(),
        })
        .collect();

    Ok(DashboardTemplate {
        admin: admin.username.clone(),
        event: EventView::new(&resolution, &state.config().recurrence),
        override_date: schedule
            .override_date()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        reset_time: state.config().reset_time.format("%H:%M").to_string(),
        signups: rows,
        roll_count,
        coffee_count,
        mailto: mailto_link(&notification),
        recipients: notification.recipients.join(", "),
        paging_enabled: state.notifier().paging_enabled(),
        error: flash.error,
        warning: flash.warning,
        success: flash.success,
        year: today.year(),
    })
}

async fn rejected(
    state: &AppState,
    admin: &CurrentAdmin,
    message: String,
) -> Result<Response, AppError> {
    let flash = Flash {
        error: Some(message),
        ..Flash::default()
    };
    let page = render_dashboard(state, admin, flash).await?;
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

/// German text for a rejected schedule change.
fn schedule_message(err: &ScheduleError) -> String {
    match err {
        ScheduleError::WrongWeekday { date, expected } => format!(
            "Der {} ist kein {}.",
            date.format("%d.%m.%Y"),
            german_weekday(*expected)
        ),
        ScheduleError::InPast { date } => {
            format!("Der {} liegt in der Vergangenheit.", date.format("%d.%m.%Y"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Weekday;

    use super::*;

    #[test]
    fn test_schedule_message() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 17).unwrap();
        assert_eq!(
            schedule_message(&ScheduleError::WrongWeekday {
                date,
                expected: Weekday::Sun
            }),
            "Der 17.06.2024 ist kein Sonntag."
        );
        assert_eq!(
            schedule_message(&ScheduleError::InPast { date }),
            "Der 17.06.2024 liegt in der Vergangenheit."
        );
    }
}
