//! Next-date inspection.

use brunch_core::{EventResolution, EventSource, Recurrence};
use brunch_server::db::{RepositoryError, ScheduleRepository};
use brunch_server::services::{Clock, SystemClock};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors from schedule commands.
#[derive(Debug, Error)]
pub enum ScheduleCommandError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Schedule error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Print the next brunch as seen on `today` (default: the local date).
///
/// Read-only: expired adjustments are dropped from a local copy, never from
/// the stored schedule state.
#[allow(clippy::print_stdout)]
pub async fn next_date(today: Option<NaiveDate>) -> Result<(), ScheduleCommandError> {
    let (config, pool) = connect().await?;
    let today = today.unwrap_or_else(|| SystemClock.today());

    let resolution = peek_next_event(&pool, config.recurrence, today).await?;

    println!("{}", describe(&resolution));
    Ok(())
}

async fn peek_next_event(
    pool: &SqlitePool,
    recurrence: Recurrence,
    today: NaiveDate,
) -> Result<EventResolution, RepositoryError> {
    let mut state = ScheduleRepository::new(pool).load_state(recurrence).await?;
    Ok(state.resolve_next_event(today))
}

fn describe(resolution: &EventResolution) -> String {
    match resolution {
        EventResolution::Scheduled {
            date,
            source: EventSource::Recurrence,
        } => format!("{date} (regular)"),
        EventResolution::Scheduled {
            date,
            source: EventSource::Override,
        } => format!("{date} (override)"),
        EventResolution::Cancelled { date } => format!("{date} (cancelled)"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brunch_core::ScheduleState;
    use brunch_server::db::create_memory_pool;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_describe() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 16).unwrap();
        assert_eq!(
            describe(&EventResolution::Scheduled {
                date,
                source: EventSource::Override
            }),
            "2024-06-16 (override)"
        );
        assert_eq!(
            describe(&EventResolution::Cancelled { date }),
            "2024-06-16 (cancelled)"
        );
    }

    #[tokio::test]
    async fn test_next_date_leaves_stored_override() {
        let pool = create_memory_pool().await.unwrap();
        let repo = ScheduleRepository::new(&pool);

        let mut state = ScheduleState::new(Recurrence::default());
        state.set_override(date(2024, 6, 9), date(2024, 6, 1)).unwrap();
        repo.save_state(&state).await.unwrap();

        // A later date resolves the regular occurrence
        let later = peek_next_event(&pool, Recurrence::default(), date(2024, 6, 20))
            .await
            .unwrap();
        assert_eq!(
            later,
            EventResolution::Scheduled {
                date: date(2024, 7, 21),
                source: EventSource::Recurrence
            }
        );

        // The stored override is untouched
        let stored = repo.load_state(Recurrence::default()).await.unwrap();
        assert_eq!(stored.override_date(), Some(date(2024, 6, 9)));
        assert_eq!(
            peek_next_event(&pool, Recurrence::default(), date(2024, 6, 1))
                .await
                .unwrap(),
            EventResolution::Scheduled {
                date: date(2024, 6, 9),
                source: EventSource::Override
            }
        );
    }
}
