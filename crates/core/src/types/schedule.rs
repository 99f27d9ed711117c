//! Event schedule state and next-date resolution.
//!
//! The next brunch date comes from the [`Recurrence`] unless an administrator
//! has set a one-off override date or cancelled the next occurrence. Both
//! one-off adjustments expire on their own: once the date they refer to lies
//! in the past, [`ScheduleState::roll_forward`] drops them and the rule takes
//! over again.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::recurrence::Recurrence;

/// Errors from administrative schedule changes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The override date does not fall on the required weekday.
    #[error("{date} is not a {expected}")]
    WrongWeekday {
        /// Rejected date.
        date: NaiveDate,
        /// Weekday required by the recurrence.
        expected: Weekday,
    },
    /// The override date lies before today.
    #[error("{date} is in the past")]
    InPast {
        /// Rejected date.
        date: NaiveDate,
    },
}

/// Where a scheduled date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Computed from the recurrence rule.
    Recurrence,
    /// Set by an administrator.
    Override,
}

/// Outcome of resolving the next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventResolution {
    /// The brunch takes place on `date`.
    Scheduled {
        /// Event date.
        date: NaiveDate,
        /// Rule or override.
        source: EventSource,
    },
    /// The brunch on `date` is cancelled.
    Cancelled {
        /// The cancelled event date.
        date: NaiveDate,
    },
}

impl EventResolution {
    /// The event date, whether it takes place or not.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Scheduled { date, .. } | Self::Cancelled { date } => *date,
        }
    }

    /// Whether the event is cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Date in the German display format `DD.MM.YYYY`.
    #[must_use]
    pub fn display_date(&self) -> String {
        self.date().format("%d.%m.%Y").to_string()
    }
}

/// Process-wide schedule state: the rule plus one-off admin adjustments.
///
/// The cancellation remembers the date it cancels so it can expire once that
/// date has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    recurrence: Recurrence,
    override_date: Option<NaiveDate>,
    cancelled_date: Option<NaiveDate>,
}

impl ScheduleState {
    /// Fresh state following `recurrence` without adjustments.
    #[must_use]
    pub const fn new(recurrence: Recurrence) -> Self {
        Self {
            recurrence,
            override_date: None,
            cancelled_date: None,
        }
    }

    /// Rebuild state from persisted parts.
    ///
    /// Values are taken as stored; stale ones are dropped by the next
    /// [`Self::roll_forward`].
    #[must_use]
    pub const fn from_parts(
        recurrence: Recurrence,
        override_date: Option<NaiveDate>,
        cancelled_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            recurrence,
            override_date,
            cancelled_date,
        }
    }

    /// The default recurrence rule.
    #[must_use]
    pub const fn recurrence(&self) -> &Recurrence {
        &self.recurrence
    }

    /// The admin-set override date, if any.
    #[must_use]
    pub const fn override_date(&self) -> Option<NaiveDate> {
        self.override_date
    }

    /// The date whose event is cancelled, if any.
    #[must_use]
    pub const fn cancelled_date(&self) -> Option<NaiveDate> {
        self.cancelled_date
    }

    /// Whether the next occurrence is cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled_date.is_some()
    }

    /// Drop adjustments whose date lies before `today`.
    ///
    /// Returns `true` if anything changed (callers persist the new state).
    pub fn roll_forward(&mut self, today: NaiveDate) -> bool {
        let mut changed = false;
        if self.override_date.is_some_and(|date| date < today) {
            self.override_date = None;
            changed = true;
        }
        if self.cancelled_date.is_some_and(|date| date < today) {
            self.cancelled_date = None;
            changed = true;
        }
        changed
    }

    /// Roll forward, then resolve the next event as seen on `today`.
    ///
    /// - cancelled: [`EventResolution::Cancelled`], regardless of any override
    /// - override set: that date
    /// - otherwise: next occurrence of the rule on or after `today`
    pub fn resolve_next_event(&mut self, today: NaiveDate) -> EventResolution {
        self.roll_forward(today);
        self.resolution(today)
    }

    /// Resolve without mutating; assumes [`Self::roll_forward`] already ran.
    #[must_use]
    pub fn resolution(&self, today: NaiveDate) -> EventResolution {
        if let Some(date) = self.cancelled_date {
            return EventResolution::Cancelled { date };
        }
        let (date, source) = self.scheduled_date(today);
        EventResolution::Scheduled { date, source }
    }

    /// Set a one-off date for the next event.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::WrongWeekday` if `date` is not on the rule's
    /// weekday, or `ScheduleError::InPast` if it lies before `today`.
    pub fn set_override(&mut self, date: NaiveDate, today: NaiveDate) -> Result<(), ScheduleError> {
        use chrono::Datelike;

        let expected = self.recurrence.weekday();
        if date.weekday() != expected {
            return Err(ScheduleError::WrongWeekday { date, expected });
        }
        if date < today {
            return Err(ScheduleError::InPast { date });
        }
        self.override_date = Some(date);
        Ok(())
    }

    /// Remove the override. Returns `true` if one was set.
    pub fn clear_override(&mut self) -> bool {
        self.override_date.take().is_some()
    }

    /// Cancel or un-cancel the next occurrence as seen on `today`.
    ///
    /// Returns `true` if the state changed.
    pub fn set_cancelled(&mut self, cancelled: bool, today: NaiveDate) -> bool {
        let rolled = self.roll_forward(today);
        let changed = match (cancelled, self.cancelled_date) {
            (true, None) => {
                self.cancelled_date = Some(self.scheduled_date(today).0);
                true
            }
            (false, Some(_)) => {
                self.cancelled_date = None;
                true
            }
            _ => false,
        };
        rolled || changed
    }

    /// Next date ignoring cancellation.
    fn scheduled_date(&self, today: NaiveDate) -> (NaiveDate, EventSource) {
        match self.override_date {
            Some(date) if date >= today => (date, EventSource::Override),
            _ => (
                self.recurrence.next_on_or_after(today),
                EventSource::Recurrence,
            ),
        }
    }
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self::new(Recurrence::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolves_recurrence_by_default() {
        let mut state = ScheduleState::default();
        assert_eq!(
            state.resolve_next_event(date(2024, 6, 1)),
            EventResolution::Scheduled {
                date: date(2024, 6, 16),
                source: EventSource::Recurrence,
            }
        );
    }

    #[test]
    fn test_set_override_rejects_monday() {
        let mut state = ScheduleState::default();
        let err = state
            .set_override(date(2024, 6, 3), date(2024, 6, 1))
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::WrongWeekday {
                date: date(2024, 6, 3),
                expected: Weekday::Sun,
            }
        );
        assert_eq!(state.override_date(), None);
    }

    #[test]
    fn test_set_override_accepts_sunday() {
        let mut state = ScheduleState::default();
        state
            .set_override(date(2024, 6, 2), date(2024, 6, 1))
            .unwrap();
        assert_eq!(
            state.resolve_next_event(date(2024, 6, 1)),
            EventResolution::Scheduled {
                date: date(2024, 6, 2),
                source: EventSource::Override,
            }
        );
    }

    #[test]
    fn test_set_override_rejects_past_date() {
        let mut state = ScheduleState::default();
        assert_eq!(
            state.set_override(date(2024, 6, 2), date(2024, 6, 10)),
            Err(ScheduleError::InPast {
                date: date(2024, 6, 2)
            })
        );
    }

    #[test]
    fn test_cancelled_wins_over_override() {
        let mut state = ScheduleState::default();
        let today = date(2024, 6, 1);
        state.set_override(date(2024, 6, 9), today).unwrap();
        assert!(state.set_cancelled(true, today));

        let resolution = state.resolve_next_event(today);
        assert!(resolution.is_cancelled());
        assert_eq!(resolution.date(), date(2024, 6, 9));
    }

    #[test]
    fn test_cancelled_without_override_cancels_rule_date() {
        let mut state = ScheduleState::default();
        let today = date(2024, 6, 1);
        state.set_cancelled(true, today);
        assert_eq!(
            state.resolve_next_event(today),
            EventResolution::Cancelled {
                date: date(2024, 6, 16)
            }
        );
    }

    #[test]
    fn test_uncancel() {
        let mut state = ScheduleState::default();
        let today = date(2024, 6, 1);
        state.set_cancelled(true, today);
        assert!(state.set_cancelled(false, today));
        assert!(!state.is_cancelled());
        assert!(!state.set_cancelled(false, today));
    }

    #[test]
    fn test_passed_override_rolls_forward() {
        let mut state = ScheduleState::default();
        state
            .set_override(date(2024, 6, 9), date(2024, 6, 1))
            .unwrap();

        let next = state.resolve_next_event(date(2024, 6, 10));
        assert!(next.date() > date(2024, 6, 9));
        assert_eq!(next.date(), date(2024, 6, 16));
        assert_eq!(state.override_date(), None);
    }

    #[test]
    fn test_passed_cancellation_rolls_forward() {
        let mut state = ScheduleState::default();
        state.set_cancelled(true, date(2024, 6, 1));

        let next = state.resolve_next_event(date(2024, 6, 17));
        assert_eq!(
            next,
            EventResolution::Scheduled {
                date: date(2024, 7, 21),
                source: EventSource::Recurrence,
            }
        );
        assert!(!state.is_cancelled());
    }

    #[test]
    fn test_event_day_is_still_current() {
        let mut state = ScheduleState::default();
        state
            .set_override(date(2024, 6, 9), date(2024, 6, 1))
            .unwrap();
        assert_eq!(state.resolve_next_event(date(2024, 6, 9)).date(), date(2024, 6, 9));
        assert_eq!(state.override_date(), Some(date(2024, 6, 9)));
    }

    #[test]
    fn test_roll_forward_reports_changes() {
        let mut state = ScheduleState::from_parts(
            Recurrence::default(),
            Some(date(2024, 6, 9)),
            Some(date(2024, 6, 9)),
        );
        assert!(!state.roll_forward(date(2024, 6, 9)));
        assert!(state.roll_forward(date(2024, 6, 10)));
        assert_eq!(state, ScheduleState::default());
    }

    #[test]
    fn test_display_date() {
        let resolution = EventResolution::Cancelled {
            date: date(2024, 6, 2),
        };
        assert_eq!(resolution.display_date(), "02.06.2024");
    }
}
