//! Roster maintenance.

use brunch_server::services::{RosterError, RosterStore};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors from roster commands.
#[derive(Debug, Error)]
pub enum RosterCommandError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),
}

/// Clear the roster immediately, outside the scheduled reset.
///
/// Returns the number of signups removed.
pub async fn reset() -> Result<u64, RosterCommandError> {
    let (_config, pool) = connect().await?;
    let removed = RosterStore::new(pool).clear().await?;
    tracing::info!("Roster cleared, {} signups removed", removed);
    Ok(removed)
}
