//! Notification dispatcher: the roster summary as mail link and pager call.
//!
//! The mail goes out through the admin's own mail client via a `mailto:`
//! link; the page is sent through DAPNET. Neither touches the roster.

use std::fmt::Write as _;

use tracing::instrument;

use brunch_core::{EventResolution, Participation, Signup, required_roll_count};

use super::dapnet::{DapnetClient, DapnetError};

/// Errors from sending a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// No DAPNET account in the credential file.
    #[error("paging is not configured")]
    NotConfigured,

    /// No callsign to page.
    #[error("no paging recipients configured")]
    NoRecipients,

    /// The paging service failed.
    #[error(transparent)]
    Dapnet(#[from] DapnetError),
}

/// A rendered roster summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Mail subject naming the event date or the cancellation.
    pub subject: String,
    /// Full participant list.
    pub body: String,
    /// One-line summary for the pager.
    pub short_text: String,
    /// Mail recipients.
    pub recipients: Vec<String>,
}

/// Build the summary for `signups` and the resolved next event.
#[must_use]
pub fn build_notification(
    signups: &[Signup],
    resolution: &EventResolution,
    recipients: &[String],
) -> Notification {
    let date = resolution.display_date();
    let rolls = required_roll_count(signups);
    let coffee = signups.len() - rolls;

    let subject = if resolution.is_cancelled() {
        format!("Brunch am {date} fällt aus")
    } else {
        format!("Brunch am {date}")
    };

    let mut body = String::new();
    if resolution.is_cancelled() {
        let _ = writeln!(body, "Der Brunch am {date} fällt aus.\n");
    }
    let _ = writeln!(body, "Anmeldungen für den Brunch am {date}:\n");
    if signups.is_empty() {
        let _ = writeln!(body, "(noch keine Anmeldungen)");
    }
    for signup in signups {
        let _ = writeln!(
            body,
            "- {}: {}",
            signup.name,
            describe_participation(&signup.participation)
        );
    }
    let _ = write!(
        body,
        "\nTeilnehmer: {}\nBrötchen für: {rolls} Personen\nNur Kaffee: {coffee}\n",
        signups.len()
    );

    let short_text = if resolution.is_cancelled() {
        format!("Brunch {date} faellt aus")
    } else {
        format!(
            "Brunch {date}: {} Teiln., {rolls} Broetchen, {coffee} Kaffee",
            signups.len()
        )
    };

    Notification {
        subject,
        body,
        short_text,
        recipients: recipients.to_vec(),
    }
}

/// What a participant brings, as shown in lists.
#[must_use]
pub fn describe_participation(participation: &Participation) -> String {
    match participation {
        Participation::CoffeeOnly => "nur Kaffee".to_string(),
        Participation::Brunch {
            contribution: Some(item),
        } => item.to_string(),
        Participation::Brunch { contribution: None } => "ohne Mitbringsel".to_string(),
    }
}

/// Percent-encoded `mailto:` URL for a notification.
#[must_use]
pub fn mailto_link(notification: &Notification) -> String {
    let to = notification
        .recipients
        .iter()
        .map(|r| urlencoding::encode(r).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "mailto:{to}?subject={}&body={}",
        urlencoding::encode(&notification.subject),
        urlencoding::encode(&notification.body)
    )
}

/// Builds notifications and pages them through DAPNET.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    recipients: Vec<String>,
    pager: Option<DapnetClient>,
}

impl NotificationDispatcher {
    /// Create a dispatcher; without a pager only mail links are available.
    #[must_use]
    pub const fn new(recipients: Vec<String>, pager: Option<DapnetClient>) -> Self {
        Self { recipients, pager }
    }

    /// Whether a pager call can be attempted.
    #[must_use]
    pub fn paging_enabled(&self) -> bool {
        self.pager.as_ref().is_some_and(DapnetClient::has_recipients)
    }

    /// Build the notification for the current roster.
    #[must_use]
    pub fn build(&self, signups: &[Signup], resolution: &EventResolution) -> Notification {
        build_notification(signups, resolution, &self.recipients)
    }

    /// Send the short text of `notification` to the pager.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::NotConfigured` or `NoRecipients` when
    /// paging is not set up, and `NotificationError::Dapnet` if the call fails.
    #[instrument(skip_all)]
    pub async fn page(&self, notification: &Notification) -> Result<(), NotificationError> {
        let pager = self.pager.as_ref().ok_or(NotificationError::NotConfigured)?;
        if !pager.has_recipients() {
            return Err(NotificationError::NoRecipients);
        }
        pager.send(&notification.short_text).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use brunch_core::{EventSource, ItemName, ParticipantName, SignupId};

    use super::*;
    use crate::services::dapnet::MAX_TEXT_CHARS;

    fn signup(id: i64, name: &str, participation: Participation) -> Signup {
        Signup {
            id: SignupId::new(id),
            name: ParticipantName::parse(name).unwrap(),
            participation,
            registered_at: Utc::now(),
        }
    }

    fn roster() -> Vec<Signup> {
        vec![
            signup(
                1,
                "Alice",
                Participation::Brunch {
                    contribution: Some(ItemName::parse("Brötchen").unwrap()),
                },
            ),
            signup(2, "Bob", Participation::CoffeeOnly),
        ]
    }

    fn scheduled() -> EventResolution {
        EventResolution::Scheduled {
            date: NaiveDate::from_ymd_opt(2024, 6, 16).unwrap(),
            source: EventSource::Recurrence,
        }
    }

    #[test]
    fn test_build_notification() {
        let n = build_notification(&roster(), &scheduled(), &["team@example.org".to_string()]);

        assert_eq!(n.subject, "Brunch am 16.06.2024");
        assert!(n.body.contains("- Alice: Brötchen"));
        assert!(n.body.contains("- Bob: nur Kaffee"));
        assert!(n.body.contains("Brötchen für: 1 Personen"));
        assert_eq!(n.recipients, vec!["team@example.org"]);
        assert!(n.short_text.chars().count() <= MAX_TEXT_CHARS);
    }

    #[test]
    fn test_build_notification_cancelled() {
        let cancelled = EventResolution::Cancelled {
            date: NaiveDate::from_ymd_opt(2024, 6, 16).unwrap(),
        };
        let n = build_notification(&[], &cancelled, &[]);
        assert_eq!(n.subject, "Brunch am 16.06.2024 fällt aus");
        assert!(n.body.contains("(noch keine Anmeldungen)"));
    }

    #[test]
    fn test_mailto_link_is_encoded() {
        let n = build_notification(
            &roster(),
            &scheduled(),
            &["a@example.org".to_string(), "b@example.org".to_string()],
        );
        let link = mailto_link(&n);

        assert!(link.starts_with("mailto:a%40example.org,b%40example.org?subject=Brunch%20am%2016.06.2024&body="));
        assert!(!link.contains(' '));
        assert!(!link.contains('\n'));
    }

    #[tokio::test]
    async fn test_page_without_pager_is_not_configured() {
        let dispatcher = NotificationDispatcher::new(Vec::new(), None);
        assert!(!dispatcher.paging_enabled());

        let n = dispatcher.build(&roster(), &scheduled());
        let err = dispatcher.page(&n).await.unwrap_err();
        assert!(matches!(err, NotificationError::NotConfigured));
    }
}
