//! Signup and withdrawal handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Datelike;
use serde::Deserialize;
use tracing::instrument;

use brunch_core::{ItemName, ParticipantName, Participation};

use crate::error::AppError;
use crate::routes::home::{SignupFormValues, render_index};
use crate::services::RosterError;
use crate::state::AppState;

const INVALID_NAME: &str = "Bitte einen gültigen Namen eingeben.";
const INVALID_ITEM: &str = "Bitte ein gültiges Mitbringsel eingeben.";

/// Signup form data.
///
/// A non-blank `custom_item` takes precedence over `selected_item`.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: String,
    #[serde(default)]
    pub selected_item: Option<String>,
    #[serde(default)]
    pub custom_item: Option<String>,
    /// Checkbox; present when ticked.
    #[serde(default)]
    pub coffee_only: Option<String>,
}

impl SignupForm {
    fn coffee_only(&self) -> bool {
        self.coffee_only.is_some()
    }

    /// The item the participant chose, if any.
    fn item(&self) -> Option<&str> {
        fn non_blank(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }
        non_blank(&self.custom_item).or_else(|| non_blank(&self.selected_item))
    }

    fn values(&self) -> SignupFormValues {
        SignupFormValues {
            name: self.name.clone(),
            selected_item: self.selected_item.clone().unwrap_or_default(),
            custom_item: self.custom_item.clone().unwrap_or_default(),
            coffee_only: self.coffee_only(),
        }
    }
}

/// Withdrawal confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "withdraw.html")]
pub struct WithdrawTemplate {
    pub name: String,
    /// Percent-encoded name for the form action.
    pub name_path: String,
    pub year: i32,
}

/// Handle the signup form.
///
/// Invalid input re-renders the form with status 400. A name that is
/// already registered leads to the withdrawal confirmation.
#[instrument(skip(state, form))]
pub async fn create(State(state): State<AppState>, Form(form): Form<SignupForm>) -> Response {
    match try_create(&state, &form).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn try_create(state: &AppState, form: &SignupForm) -> Result<Response, AppError> {
    if ParticipantName::parse(&form.name).is_err() {
        return rejected(state, form, INVALID_NAME).await;
    }

    // Coffee-only guests bring nothing, so their item field is not checked
    let contribution = if form.coffee_only() {
        None
    } else {
        match ItemName::parse_optional(form.item()) {
            Ok(item) => item,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected contribution item");
                return rejected(state, form, INVALID_ITEM).await;
            }
        }
    };
    let participation = Participation::from_form(form.coffee_only(), contribution);

    match state.roster().add_signup(&form.name, participation).await {
        Ok(_) => Ok(Redirect::to("/?success=signed_up").into_response()),
        Err(RosterError::DuplicateName(name)) => {
            let target = format!("/signup/{}/withdraw", urlencoding::encode(name.as_str()));
            Ok(Redirect::to(&target).into_response())
        }
        Err(RosterError::InvalidName(_)) => rejected(state, form, INVALID_NAME).await,
        Err(e) => Err(e.into()),
    }
}

async fn rejected(state: &AppState, form: &SignupForm, message: &str) -> Result<Response, AppError> {
    let page = render_index(state, form.values(), Some(message.to_string()), None).await?;
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

/// Ask for confirmation before withdrawing a signup.
#[instrument(skip(state))]
pub async fn withdraw_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    match state.roster().contains(&name).await {
        Ok(true) => Ok(WithdrawTemplate {
            name_path: urlencoding::encode(name.trim()).into_owned(),
            name: name.trim().to_string(),
            year: state.today().year(),
        }
        .into_response()),
        Ok(false) | Err(RosterError::InvalidName(_)) => {
            Ok(Redirect::to("/?error=not_registered").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Withdraw a signup.
#[instrument(skip(state))]
pub async fn withdraw(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, AppError> {
    match state.roster().remove_signup(&name).await {
        Ok(true) => Ok(Redirect::to("/?success=withdrawn")),
        Ok(false) | Err(RosterError::InvalidName(_)) => Ok(Redirect::to("/?error=not_registered")),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(selected: Option<&str>, custom: Option<&str>, coffee: bool) -> SignupForm {
        SignupForm {
            name: "Alice".to_string(),
            selected_item: selected.map(String::from),
            custom_item: custom.map(String::from),
            coffee_only: coffee.then(|| "on".to_string()),
        }
    }

    #[test]
    fn test_custom_item_wins() {
        assert_eq!(form(Some("Käse"), Some("Obst"), false).item(), Some("Obst"));
        assert_eq!(form(Some("Käse"), Some("  "), false).item(), Some("Käse"));
        assert_eq!(form(Some(""), None, false).item(), None);
        assert_eq!(form(None, Some("  Obst "), false).item(), Some("Obst"));
    }

    #[test]
    fn test_coffee_only_checkbox() {
        assert!(form(None, None, true).coffee_only());
        assert!(!form(None, None, false).coffee_only());
    }
}
