//! Signup page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use chrono::Datelike;
use serde::Deserialize;
use tracing::instrument;

use brunch_core::{EventResolution, EventSource, Recurrence, german_weekday};

use crate::error::AppError;
use crate::routes::message_for;
use crate::state::AppState;

const SUCCESS_MESSAGES: &[(&str, &str)] = &[
    ("signed_up", "Danke, du bist angemeldet!"),
    ("withdrawn", "Deine Anmeldung wurde gelöscht."),
];

const ERROR_MESSAGES: &[(&str, &str)] = &[(
    "not_registered",
    "Unter diesem Namen ist niemand angemeldet.",
)];

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// The next brunch as shown on the pages.
#[derive(Debug, Clone)]
pub struct EventView {
    /// `DD.MM.YYYY`
    pub date: String,
    /// German weekday name.
    pub weekday: &'static str,
    pub cancelled: bool,
    /// Moved away from the regular date by an admin.
    pub moved: bool,
    /// The regular rule, e.g. "jeden 3. Sonntag im Monat".
    pub rule: String,
}

impl EventView {
    #[must_use]
    pub fn new(resolution: &EventResolution, recurrence: &Recurrence) -> Self {
        Self {
            date: resolution.display_date(),
            weekday: german_weekday(resolution.date().weekday()),
            cancelled: resolution.is_cancelled(),
            moved: matches!(
                resolution,
                EventResolution::Scheduled {
                    source: EventSource::Override,
                    ..
                }
            ),
            rule: recurrence.describe(),
        }
    }
}

/// Values to put back into the signup form after a rejected submission.
#[derive(Debug, Clone, Default)]
pub struct SignupFormValues {
    pub name: String,
    pub selected_item: String,
    pub custom_item: String,
    pub coffee_only: bool,
}

/// A choice in the item dropdown.
#[derive(Debug, Clone)]
pub struct ItemOption {
    pub name: String,
    pub selected: bool,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub event: EventView,
    pub items: Vec<ItemOption>,
    pub participant_count: usize,
    pub roll_count: usize,
    pub coffee_count: usize,
    pub form: SignupFormValues,
    pub error: Option<String>,
    pub success: Option<String>,
    pub year: i32,
}

/// Display the signup page.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<IndexTemplate, AppError> {
    render_index(
        &state,
        SignupFormValues::default(),
        message_for(query.error.as_deref(), ERROR_MESSAGES),
        message_for(query.success.as_deref(), SUCCESS_MESSAGES),
    )
    .await
}

/// Build the signup page for the current roster and schedule.
pub(crate) async fn render_index(
    state: &AppState,
    form: SignupFormValues,
    error: Option<String>,
    success: Option<String>,
) -> Result<IndexTemplate, AppError> {
    let today = state.today();
    let resolution = state.resolver().resolve_next_event(today).await?;
    let signups = state.roster().list_signups().await?;
    let items = state
        .roster()
        .available_items()
        .await?
        .into_iter()
        .map(|item| {
            let name = item.name.into_inner();
            ItemOption {
                selected: name == form.selected_item,
                name,
            }
        })
        .collect();

    let roll_count = brunch_core::required_roll_count(&signups);

    Ok(IndexTemplate {
        event: EventView::new(&resolution, &state.config().recurrence),
        items,
        participant_count: signups.len(),
        roll_count,
        coffee_count: signups.len() - roll_count,
        form,
        error,
        success,
        year: today.year(),
    })
}
