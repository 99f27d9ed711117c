//! CLI command implementations.

pub mod migrate;
pub mod password;
pub mod roster;
pub mod schedule;

use brunch_server::config::{ConfigError, ServerConfig};
use brunch_server::db;
use sqlx::SqlitePool;
use thiserror::Error;

/// Errors while opening the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Invalid environment.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection or migration error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load the server configuration and open its migrated database.
pub async fn connect() -> Result<(ServerConfig, SqlitePool), ConnectError> {
    let config = ServerConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    Ok((config, pool))
}
