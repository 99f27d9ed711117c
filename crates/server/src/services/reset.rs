//! Reset scheduler: clears the roster once per cycle.
//!
//! The roster belongs to one event. At the reset time on the event day the
//! background task clears it and records the event date as reset, so repeated
//! polling and restarts never clear the same cycle twice. If the process was
//! down across a reset time, the first tick afterwards catches up.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::schedule::keys;
use crate::db::{RepositoryError, ScheduleRepository};
use crate::services::clock::Clock;
use crate::services::resolver::{EventDateResolver, ResolverError};
use crate::services::roster::{RosterError, RosterStore};

/// Errors from a scheduler tick.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// The event date could not be resolved.
    #[error("resolving event date: {0}")]
    Resolver(#[from] ResolverError),

    /// The roster could not be cleared.
    #[error("clearing roster: {0}")]
    Roster(#[from] RosterError),

    /// The last-reset marker could not be read or written.
    #[error("reset bookkeeping: {0}")]
    Repository(#[from] RepositoryError),
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The reset time of the current cycle has not come yet.
    Waiting {
        /// When the roster will be cleared.
        trigger: NaiveDateTime,
    },
    /// This cycle was already cleared.
    AlreadyReset {
        /// Event date of the cycle.
        cycle: NaiveDate,
    },
    /// The roster was cleared.
    Cleared {
        /// Event date of the cycle that ended.
        cycle: NaiveDate,
        /// Number of signups removed.
        removed: u64,
    },
}

/// Background job clearing the roster after each event.
#[derive(Clone)]
pub struct ResetScheduler {
    pool: SqlitePool,
    roster: RosterStore,
    resolver: EventDateResolver,
    clock: Arc<dyn Clock>,
    reset_time: NaiveTime,
}

impl ResetScheduler {
    /// Create a scheduler clearing `roster` at `reset_time` on each event day.
    #[must_use]
    pub fn new(
        pool: SqlitePool,
        roster: RosterStore,
        resolver: EventDateResolver,
        clock: Arc<dyn Clock>,
        reset_time: NaiveTime,
    ) -> Self {
        Self {
            pool,
            roster,
            resolver,
            clock,
            reset_time,
        }
    }

    /// Check the clock once and clear the roster if a cycle has ended.
    ///
    /// # Errors
    ///
    /// Returns `ResetError` if the schedule, the roster, or the bookkeeping
    /// cannot be read or written. Nothing is recorded as reset in that case,
    /// so the next tick tries again.
    pub async fn tick(&self) -> Result<TickOutcome, ResetError> {
        let now = self.clock.now();
        let today = now.date();
        let event_date = self.resolver.resolve_next_event(today).await?.date();

        let repo = ScheduleRepository::new(&self.pool);
        let last_reset = repo.get_date(keys::LAST_RESET_DATE).await?;
        let observed = repo.get_date(keys::OBSERVED_EVENT_DATE).await?;

        // A cycle that ended while the process was down
        if let Some(missed) = observed.filter(|&prev| {
            prev < today && prev != event_date && last_reset.is_none_or(|d| d < prev)
        }) {
            tracing::warn!(cycle = %missed, "Reset time was missed, clearing now");
            let outcome = self.clear_cycle(&repo, missed).await?;
            repo.set_date(keys::OBSERVED_EVENT_DATE, Some(event_date))
                .await?;
            return Ok(outcome);
        }

        if observed != Some(event_date) {
            repo.set_date(keys::OBSERVED_EVENT_DATE, Some(event_date))
                .await?;
        }

        let trigger = event_date.and_time(self.reset_time);
        if now < trigger {
            return Ok(TickOutcome::Waiting { trigger });
        }
        if last_reset.is_some_and(|d| d >= event_date) {
            return Ok(TickOutcome::AlreadyReset { cycle: event_date });
        }

        self.clear_cycle(&repo, event_date).await
    }

    async fn clear_cycle(
        &self,
        repo: &ScheduleRepository<'_>,
        cycle: NaiveDate,
    ) -> Result<TickOutcome, ResetError> {
        let removed = self.roster.clear().await?;
        repo.set_date(keys::LAST_RESET_DATE, Some(cycle)).await?;
        Ok(TickOutcome::Cleared { cycle, removed })
    }

    /// Run [`Self::tick`] every `poll_interval` on a background task.
    ///
    /// Errors are logged and retried on the next tick.
    #[must_use]
    pub fn spawn(self, poll_interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                reset_time = %self.reset_time,
                poll_secs = poll_interval.as_secs(),
                "Reset scheduler started"
            );

            loop {
                interval.tick().await;
                match self.tick().await {
                    Ok(TickOutcome::Cleared { cycle, removed }) => {
                        tracing::info!(%cycle, removed, "Brunch cycle reset");
                    }
                    Ok(outcome) => tracing::trace!(?outcome, "Reset check"),
                    Err(e) => {
                        let event_id = sentry::capture_error(&e);
                        tracing::error!(
                            error = %e,
                            sentry_event_id = %event_id,
                            "Reset scheduler tick failed"
                        );
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for ResetScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetScheduler")
            .field("clock", &self.clock)
            .field("reset_time", &self.reset_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brunch_core::{Participation, Recurrence};

    use super::*;
    use crate::db::create_memory_pool;
    use crate::services::clock::ManualClock;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        pool: SqlitePool,
        roster: RosterStore,
        resolver: EventDateResolver,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        async fn new(now: NaiveDateTime) -> Self {
            let pool = create_memory_pool().await.unwrap();
            let roster = RosterStore::new(pool.clone());
            let resolver = EventDateResolver::load(pool.clone(), Recurrence::default())
                .await
                .unwrap();
            Self {
                pool,
                roster,
                resolver,
                clock: Arc::new(ManualClock::new(now)),
            }
        }

        fn scheduler(&self) -> ResetScheduler {
            ResetScheduler::new(
                self.pool.clone(),
                self.roster.clone(),
                self.resolver.clone(),
                self.clock.clone(),
                NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            )
        }

        async fn sign_up(&self, name: &str) {
            self.roster
                .add_signup(name, Participation::CoffeeOnly)
                .await
                .unwrap();
        }

        async fn roster_len(&self) -> usize {
            self.roster.list_signups().await.unwrap().len()
        }
    }

    #[tokio::test]
    async fn test_waits_until_reset_time() {
        let fx = Fixture::new(at(2024, 6, 16, 14, 59)).await;
        fx.sign_up("Alice").await;

        let outcome = fx.scheduler().tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Waiting {
                trigger: at(2024, 6, 16, 15, 0)
            }
        );
        assert_eq!(fx.roster_len().await, 1);
    }

    #[tokio::test]
    async fn test_clears_exactly_once_per_cycle() {
        let fx = Fixture::new(at(2024, 6, 16, 14, 58)).await;
        fx.sign_up("Alice").await;
        fx.sign_up("Bob").await;
        let scheduler = fx.scheduler();

        let mut cleared = 0;
        for _ in 0..10 {
            if let TickOutcome::Cleared { cycle, removed } = scheduler.tick().await.unwrap() {
                assert_eq!(cycle, date(2024, 6, 16));
                assert_eq!(removed, 2);
                cleared += 1;
            }
            fx.clock.advance(chrono::Duration::minutes(1));
        }
        assert_eq!(cleared, 1);

        // Late signups on the same afternoon stay for the next cycle
        fx.sign_up("Carol").await;
        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::AlreadyReset {
                cycle: date(2024, 6, 16)
            }
        );
        assert_eq!(fx.roster_len().await, 1);

        // Next day belongs to the July cycle
        fx.clock.set(at(2024, 6, 17, 9, 0));
        assert!(matches!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Waiting { .. }
        ));
        assert_eq!(fx.roster_len().await, 1);
    }

    #[tokio::test]
    async fn test_restart_does_not_clear_twice() {
        let fx = Fixture::new(at(2024, 6, 16, 15, 5)).await;
        assert!(matches!(
            fx.scheduler().tick().await.unwrap(),
            TickOutcome::Cleared { .. }
        ));

        fx.sign_up("Alice").await;
        let restarted = fx.scheduler();
        assert!(matches!(
            restarted.tick().await.unwrap(),
            TickOutcome::AlreadyReset { .. }
        ));
        assert_eq!(fx.roster_len().await, 1);
    }

    #[tokio::test]
    async fn test_catches_up_after_downtime() {
        let fx = Fixture::new(at(2024, 6, 16, 10, 0)).await;
        fx.sign_up("Alice").await;
        let scheduler = fx.scheduler();
        assert!(matches!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Waiting { .. }
        ));

        // Down from Sunday morning until Tuesday
        fx.clock.set(at(2024, 6, 18, 8, 0));
        assert_eq!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Cleared {
                cycle: date(2024, 6, 16),
                removed: 1
            }
        );
        assert!(matches!(
            scheduler.tick().await.unwrap(),
            TickOutcome::Waiting { .. }
        ));
    }

    #[tokio::test]
    async fn test_cancelled_event_still_ends_cycle() {
        let fx = Fixture::new(at(2024, 6, 1, 12, 0)).await;
        fx.resolver
            .set_cancelled(true, date(2024, 6, 1))
            .await
            .unwrap();
        fx.sign_up("Alice").await;

        fx.clock.set(at(2024, 6, 16, 15, 0));
        assert_eq!(
            fx.scheduler().tick().await.unwrap(),
            TickOutcome::Cleared {
                cycle: date(2024, 6, 16),
                removed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_override_moves_reset() {
        let fx = Fixture::new(at(2024, 6, 1, 12, 0)).await;
        fx.resolver
            .set_override(date(2024, 6, 9), date(2024, 6, 1))
            .await
            .unwrap();
        fx.sign_up("Alice").await;

        fx.clock.set(at(2024, 6, 9, 15, 30));
        assert_eq!(
            fx.scheduler().tick().await.unwrap(),
            TickOutcome::Cleared {
                cycle: date(2024, 6, 9),
                removed: 1
            }
        );
    }
}
