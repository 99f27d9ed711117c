//! Default recurrence rule for the brunch.
//!
//! The brunch normally happens on a fixed weekday pattern, e.g. the third
//! Sunday of every month. The rule is configuration, written as:
//!
//! ```text
//! monthly:<n>:<weekday>   n-th weekday of the month (n = 1..=5)
//! weekly:<weekday>        every week on that weekday
//! ```
//!
//! Weekdays use English names or abbreviations (`sun`, `Sunday`).

use core::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Months searched for an n-th weekday before giving up. Every weekday occurs
/// five times in several months of any year, so this is never exhausted for
/// a valid rule.
const MONTH_SEARCH_LIMIT: u32 = 24;

/// Errors that can occur when parsing a [`Recurrence`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    /// The rule kind is not `monthly` or `weekly`.
    #[error("unknown recurrence kind '{0}' (expected 'monthly' or 'weekly')")]
    UnknownKind(String),
    /// The rule has the wrong number of `:`-separated parts.
    #[error("malformed recurrence '{0}'")]
    Malformed(String),
    /// The weekday could not be parsed.
    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),
    /// The week ordinal is outside `1..=5`.
    #[error("week of month must be between 1 and 5, got '{0}'")]
    InvalidWeek(String),
}

/// A recurrence rule producing the default event dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// The `week`-th `weekday` of every month (1-based).
    Monthly {
        /// Ordinal of the weekday within the month (1..=5).
        week: u8,
        /// Day of the week.
        weekday: Weekday,
    },
    /// Every week on `weekday`.
    Weekly {
        /// Day of the week.
        weekday: Weekday,
    },
}

impl Default for Recurrence {
    /// Third Sunday of the month.
    fn default() -> Self {
        Self::Monthly {
            week: 3,
            weekday: Weekday::Sun,
        }
    }
}

impl Recurrence {
    /// Create a monthly rule.
    ///
    /// # Errors
    ///
    /// Returns `RecurrenceError::InvalidWeek` if `week` is not in `1..=5`.
    pub fn monthly(week: u8, weekday: Weekday) -> Result<Self, RecurrenceError> {
        if !(1..=5).contains(&week) {
            return Err(RecurrenceError::InvalidWeek(week.to_string()));
        }
        Ok(Self::Monthly { week, weekday })
    }

    /// Create a weekly rule.
    #[must_use]
    pub const fn weekly(weekday: Weekday) -> Self {
        Self::Weekly { weekday }
    }

    /// The weekday every event date (including overrides) must fall on.
    #[must_use]
    pub const fn weekday(&self) -> Weekday {
        match self {
            Self::Monthly { weekday, .. } | Self::Weekly { weekday } => *weekday,
        }
    }

    /// Whether `date` is an occurrence of this rule.
    #[must_use]
    pub fn is_occurrence(&self, date: NaiveDate) -> bool {
        self.next_on_or_after(date) == date
    }

    /// The first occurrence on or after `date`.
    #[must_use]
    pub fn next_on_or_after(&self, date: NaiveDate) -> NaiveDate {
        match *self {
            Self::Weekly { weekday } => next_weekday(date, weekday),
            Self::Monthly { week, weekday } => {
                let first_of_month = date.with_day(1).unwrap_or(date);
                (0..MONTH_SEARCH_LIMIT)
                    .filter_map(|offset| first_of_month.checked_add_months(Months::new(offset)))
                    .filter_map(|month| {
                        NaiveDate::from_weekday_of_month_opt(
                            month.year(),
                            month.month(),
                            weekday,
                            week,
                        )
                    })
                    .find(|candidate| *candidate >= date)
                    .unwrap_or_else(|| next_weekday(date, weekday))
            }
        }
    }

    /// The first occurrence strictly after `date`.
    #[must_use]
    pub fn next_after(&self, date: NaiveDate) -> NaiveDate {
        let tomorrow = date.checked_add_days(Days::new(1)).unwrap_or(date);
        self.next_on_or_after(tomorrow)
    }

    /// Human-readable German description, e.g. "jeden 3. Sonntag im Monat".
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Monthly { week, weekday } => {
                format!("jeden {week}. {} im Monat", german_weekday(*weekday))
            }
            Self::Weekly { weekday } => format!("jeden {}", german_weekday(*weekday)),
        }
    }
}

/// First `weekday` on or after `date`.
fn next_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7;
    date.checked_add_days(Days::new(u64::from(ahead)))
        .unwrap_or(date)
}

/// German name of a weekday.
#[must_use]
pub const fn german_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}

fn parse_weekday(s: &str) -> Result<Weekday, RecurrenceError> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| RecurrenceError::InvalidWeekday(s.to_owned()))
}

impl FromStr for Recurrence {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [kind, week, weekday] if kind.eq_ignore_ascii_case("monthly") => {
                let week = week
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| RecurrenceError::InvalidWeek((*week).to_owned()))?;
                Self::monthly(week, parse_weekday(weekday)?)
            }
            [kind, weekday] if kind.eq_ignore_ascii_case("weekly") => {
                Ok(Self::weekly(parse_weekday(weekday)?))
            }
            [kind, ..] if !kind.eq_ignore_ascii_case("monthly")
                && !kind.eq_ignore_ascii_case("weekly") =>
            {
                Err(RecurrenceError::UnknownKind((*kind).to_owned()))
            }
            _ => Err(RecurrenceError::Malformed(s.to_owned())),
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly { week, weekday } => {
                write!(f, "monthly:{week}:{}", weekday.to_string().to_lowercase())
            }
            Self::Weekly { weekday } => {
                write!(f, "weekly:{}", weekday.to_string().to_lowercase())
            }
        }
    }
}
