//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! brunch-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BRUNCH_DATABASE_URL` - `SQLite` URL (default: `sqlite://brunch.db?mode=rwc`)
//!
//! Migrations are embedded from `crates/server/migrations/`; the server also
//! applies them at startup.

use super::{ConnectError, connect};

/// Apply all pending migrations.
pub async fn run() -> Result<(), ConnectError> {
    let (_config, pool) = connect().await?;
    pool.close().await;
    tracing::info!("Migrations complete!");
    Ok(())
}
