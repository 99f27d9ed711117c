//! Application state shared across handlers and the reset task.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;

use brunch_core::{CredentialStore, PagingCredentials};

use crate::config::ServerConfig;
use crate::db::RepositoryError;
use crate::services::{
    Clock, DapnetClient, DapnetError, EventDateResolver, NotificationDispatcher, ResetScheduler,
    RosterStore,
};

/// Errors while assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The schedule state could not be loaded.
    #[error("loading schedule state: {0}")]
    Repository(#[from] RepositoryError),

    /// The paging client could not be built.
    #[error("creating DAPNET client: {0}")]
    Dapnet(#[from] DapnetError),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: SqlitePool,
    roster: RosterStore,
    resolver: EventDateResolver,
    notifier: NotificationDispatcher,
    credentials: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Assemble the state. The database must already be migrated.
    ///
    /// Paging is enabled when `paging` credentials are given.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the schedule state cannot be loaded or the
    /// paging client cannot be created.
    pub async fn new(
        config: ServerConfig,
        pool: SqlitePool,
        credentials: Arc<dyn CredentialStore>,
        paging: Option<PagingCredentials>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StateError> {
        let roster = RosterStore::new(pool.clone());
        let resolver = EventDateResolver::load(pool.clone(), config.recurrence).await?;

        let pager = match paging {
            Some(account) => {
                let client = DapnetClient::new(&config.dapnet, account)?;
                if !client.has_recipients() {
                    tracing::warn!("DAPNET account configured but DAPNET_CALLSIGNS is empty");
                }
                Some(client)
            }
            None => None,
        };
        let notifier = NotificationDispatcher::new(config.mail_recipients.clone(), pager);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                roster,
                resolver,
                notifier,
                credentials,
                clock,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the roster store.
    #[must_use]
    pub fn roster(&self) -> &RosterStore {
        &self.inner.roster
    }

    /// Get a reference to the event date resolver.
    #[must_use]
    pub fn resolver(&self) -> &EventDateResolver {
        &self.inner.resolver
    }

    /// Get a reference to the notification dispatcher.
    #[must_use]
    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.inner.notifier
    }

    /// Get a reference to the admin credential store.
    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.inner.credentials.as_ref()
    }

    /// Today's local date according to the injected clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.inner.clock.today()
    }

    /// Build the reset job for this state.
    #[must_use]
    pub fn reset_scheduler(&self) -> ResetScheduler {
        ResetScheduler::new(
            self.inner.pool.clone(),
            self.inner.roster.clone(),
            self.inner.resolver.clone(),
            Arc::clone(&self.inner.clock),
            self.inner.config.reset_time,
        )
    }
}
