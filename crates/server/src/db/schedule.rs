//! Schedule state persistence.
//!
//! A small key/value table holding the admin adjustments and the reset job's
//! bookkeeping. Dates are stored as ISO 8601 (`YYYY-MM-DD`); an absent key
//! means "not set".

use chrono::NaiveDate;
use sqlx::SqlitePool;

use brunch_core::{Recurrence, ScheduleState};

use super::RepositoryError;

/// Keys used in the `schedule_state` table.
pub mod keys {
    /// Admin override date for the next event.
    pub const OVERRIDE_DATE: &str = "override_date";
    /// Date of the cancelled event.
    pub const CANCELLED_DATE: &str = "cancelled_date";
    /// Event date whose cycle was last reset.
    pub const LAST_RESET_DATE: &str = "last_reset_date";
    /// Event date the reset job saw on its last tick.
    pub const OBSERVED_EVENT_DATE: &str = "observed_event_date";
}

/// Repository for the `schedule_state` key/value table.
pub struct ScheduleRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ScheduleRepository<'a> {
    /// Create a new schedule repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a date value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored value is not a date.
    pub async fn get_date(&self, key: &str) -> Result<Option<NaiveDate>, RepositoryError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM schedule_state WHERE key = ?1")
                .bind(key)
                .fetch_optional(self.pool)
                .await?;

        value
            .map(|raw| {
                raw.parse::<NaiveDate>().map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid date for {key}: {e}"))
                })
            })
            .transpose()
    }

    /// Write or remove a date value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_date(&self, key: &str, date: Option<NaiveDate>) -> Result<(), RepositoryError> {
        match date {
            Some(date) => {
                sqlx::query(
                    r"
                    INSERT INTO schedule_state (key, value)
                    VALUES (?1, ?2)
                    ON CONFLICT (key) DO UPDATE
                    SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
                    ",
                )
                .bind(key)
                .bind(date.to_string())
                .execute(self.pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM schedule_state WHERE key = ?1")
                    .bind(key)
                    .execute(self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    /// Load the schedule state for the configured rule.
    ///
    /// # Errors
    ///
    /// See [`Self::get_date`].
    pub async fn load_state(&self, recurrence: Recurrence) -> Result<ScheduleState, RepositoryError> {
        let override_date = self.get_date(keys::OVERRIDE_DATE).await?;
        let cancelled_date = self.get_date(keys::CANCELLED_DATE).await?;
        Ok(ScheduleState::from_parts(
            recurrence,
            override_date,
            cancelled_date,
        ))
    }

    /// Persist the admin adjustments of a schedule state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a write fails.
    pub async fn save_state(&self, state: &ScheduleState) -> Result<(), RepositoryError> {
        self.set_date(keys::OVERRIDE_DATE, state.override_date())
            .await?;
        self.set_date(keys::CANCELLED_DATE, state.cancelled_date())
            .await
    }
}
