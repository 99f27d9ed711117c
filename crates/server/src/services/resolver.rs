//! Event date resolver: owns the schedule state and keeps it persisted.
//!
//! Every change (admin action or roll-forward) is applied to a copy, written
//! to the `schedule_state` table and only then published, so the in-memory
//! state never runs ahead of the database.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::instrument;

use brunch_core::{EventResolution, Recurrence, ScheduleError, ScheduleState};

use crate::db::{RepositoryError, ScheduleRepository};

/// Errors from schedule changes.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// The requested change is not allowed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Resolves the next event date from the recurrence and admin adjustments.
#[derive(Clone)]
pub struct EventDateResolver {
    pool: SqlitePool,
    state: Arc<Mutex<ScheduleState>>,
}

impl EventDateResolver {
    /// Load persisted adjustments for `recurrence`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the stored state cannot be read.
    pub async fn load(pool: SqlitePool, recurrence: Recurrence) -> Result<Self, RepositoryError> {
        let state = ScheduleRepository::new(&pool).load_state(recurrence).await?;
        tracing::debug!(?state, "Loaded schedule state");
        Ok(Self {
            pool,
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Resolve the next event as seen on `today`, dropping passed adjustments.
    ///
    /// # Errors
    ///
    /// Returns `ResolverError::Repository` if a roll-forward cannot be saved.
    pub async fn resolve_next_event(
        &self,
        today: NaiveDate,
    ) -> Result<EventResolution, ResolverError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        if next.roll_forward(today) {
            self.persist(&next).await?;
            tracing::info!(%today, "Expired schedule adjustments cleared");
            *state = next;
        }
        Ok(state.resolution(today))
    }

    /// Move the next event to `date`.
    ///
    /// # Errors
    ///
    /// Returns `ResolverError::Schedule` if `date` is on the wrong weekday or
    /// in the past.
    #[instrument(skip(self))]
    pub async fn set_override(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<EventResolution, ResolverError> {
        self.update(today, |state| state.set_override(date, today).map(|()| true))
            .await
    }

    /// Go back to the recurrence for the next event.
    ///
    /// # Errors
    ///
    /// Returns `ResolverError::Repository` if the change cannot be saved.
    #[instrument(skip(self))]
    pub async fn clear_override(&self, today: NaiveDate) -> Result<EventResolution, ResolverError> {
        self.update(today, |state| Ok(state.clear_override())).await
    }

    /// Cancel or restore the next event.
    ///
    /// # Errors
    ///
    /// Returns `ResolverError::Repository` if the change cannot be saved.
    #[instrument(skip(self))]
    pub async fn set_cancelled(
        &self,
        cancelled: bool,
        today: NaiveDate,
    ) -> Result<EventResolution, ResolverError> {
        self.update(today, |state| Ok(state.set_cancelled(cancelled, today)))
            .await
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> ScheduleState {
        self.state.lock().await.clone()
    }

    /// Apply `change` to a copy of the rolled-forward state, persist, publish.
    async fn update<F>(&self, today: NaiveDate, change: F) -> Result<EventResolution, ResolverError>
    where
        F: FnOnce(&mut ScheduleState) -> Result<bool, ScheduleError>,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let rolled = next.roll_forward(today);
        let changed = change(&mut next)?;

        if rolled || changed {
            self.persist(&next).await?;
            *state = next;
            tracing::info!(
                override_date = ?state.override_date(),
                cancelled_date = ?state.cancelled_date(),
                "Schedule updated"
            );
        }
        Ok(state.resolution(today))
    }

    async fn persist(&self, state: &ScheduleState) -> Result<(), RepositoryError> {
        ScheduleRepository::new(&self.pool).save_state(state).await
    }
}

impl std::fmt::Debug for EventDateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDateResolver").finish_non_exhaustive()
    }
}
