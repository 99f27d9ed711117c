//! Roster store: the current cycle's signups and the contribution catalog.
//!
//! Writes are serialized through one async mutex so that the duplicate check
//! and the insert, and the reset job's clear, never interleave.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::instrument;

use brunch_core::{ItemName, LabelError, ParticipantName, Participation, Signup};

use crate::db::items::CatalogItem;
use crate::db::{ItemRepository, RepositoryError, SignupRepository};

/// Errors from roster operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// The participant name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(LabelError),

    /// A participant of that name is already registered.
    #[error("'{0}' is already registered")]
    DuplicateName(ParticipantName),

    /// The catalog seed file could not be read.
    #[error("catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Current-cycle signups plus the catalog of suggested items.
#[derive(Clone)]
pub struct RosterStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl RosterStore {
    /// Create a roster store on `pool`.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Register a participant.
    ///
    /// A named contribution is also added to the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::InvalidName` if `name` fails validation and
    /// `RosterError::DuplicateName` if the name (ignoring case) is taken.
    #[instrument(skip(self, participation))]
    pub async fn add_signup(
        &self,
        name: &str,
        participation: Participation,
    ) -> Result<Signup, RosterError> {
        let name = ParticipantName::parse(name).map_err(RosterError::InvalidName)?;

        let _guard = self.write_lock.lock().await;
        let signups = SignupRepository::new(&self.pool);

        if signups.exists(&name).await? {
            return Err(RosterError::DuplicateName(name));
        }

        let signup = match signups.create(&name, &participation, Utc::now()).await {
            Ok(signup) => signup,
            Err(RepositoryError::Conflict(_)) => return Err(RosterError::DuplicateName(name)),
            Err(e) => return Err(e.into()),
        };

        if let Some(item) = participation.contribution() {
            let added = ItemRepository::new(&self.pool).insert_if_absent(item).await?;
            if added {
                tracing::info!(item = %item, "Added contribution item to catalog");
            }
        }

        tracing::info!(
            signup_id = %signup.id,
            coffee_only = participation.is_coffee_only(),
            "Participant signed up"
        );
        Ok(signup)
    }

    /// All signups of the current cycle in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Repository` if the query fails.
    pub async fn list_signups(&self) -> Result<Vec<Signup>, RosterError> {
        Ok(SignupRepository::new(&self.pool).list().await?)
    }

    /// Whether a participant is registered.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::InvalidName` if `name` fails validation.
    pub async fn contains(&self, name: &str) -> Result<bool, RosterError> {
        let name = ParticipantName::parse(name).map_err(RosterError::InvalidName)?;
        Ok(SignupRepository::new(&self.pool).exists(&name).await?)
    }

    /// Withdraw a participant's signup. Returns `true` if one was removed.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::InvalidName` if `name` fails validation.
    #[instrument(skip(self))]
    pub async fn remove_signup(&self, name: &str) -> Result<bool, RosterError> {
        let name = ParticipantName::parse(name).map_err(RosterError::InvalidName)?;

        let _guard = self.write_lock.lock().await;
        let removed = SignupRepository::new(&self.pool)
            .delete_by_name(&name)
            .await?;
        if removed {
            tracing::info!("Participant withdrew");
        }
        Ok(removed)
    }

    /// Remove every signup. Safe to call on an empty roster.
    ///
    /// Returns the number of signups removed.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Repository` if the delete fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64, RosterError> {
        let _guard = self.write_lock.lock().await;
        let removed = SignupRepository::new(&self.pool).delete_all().await?;
        tracing::info!(removed, "Roster cleared");
        Ok(removed)
    }

    /// Catalog items no current signup has claimed.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Repository` if the query fails.
    pub async fn available_items(&self) -> Result<Vec<CatalogItem>, RosterError> {
        Ok(ItemRepository::new(&self.pool).list_available().await?)
    }

    /// Add an item to the catalog unless it is already there.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Repository` if the insert fails.
    pub async fn add_catalog_item(&self, item: &ItemName) -> Result<bool, RosterError> {
        Ok(ItemRepository::new(&self.pool).insert_if_absent(item).await?)
    }

    /// Seed the catalog from a file with one item per line.
    ///
    /// A missing file seeds nothing. Invalid lines are skipped with a warning.
    /// Returns the number of new items.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Io` if the file exists but cannot be read.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn seed_catalog(&self, path: &Path) -> Result<usize, RosterError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Catalog file not found, starting with an empty catalog");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let mut added = 0;
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            match ItemName::parse(line) {
                Ok(item) => {
                    if self.add_catalog_item(&item).await? {
                        added += 1;
                    }
                }
                Err(e) => tracing::warn!(line, error = %e, "Skipping catalog entry"),
            }
        }

        tracing::info!(added, "Catalog seeded");
        Ok(added)
    }
}

impl std::fmt::Debug for RosterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::db::create_memory_pool;

    async fn store() -> RosterStore {
        RosterStore::new(create_memory_pool().await.unwrap())
    }

    fn bringing(item: &str) -> Participation {
        Participation::Brunch {
            contribution: Some(ItemName::parse(item).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_add_signup_appends_at_end() {
        let roster = store().await;
        roster.add_signup("Alice", bringing("Brötchen")).await.unwrap();
        let before = roster.list_signups().await.unwrap();

        roster
            .add_signup("Bob", Participation::CoffeeOnly)
            .await
            .unwrap();
        let after = roster.list_signups().await.unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after[..before.len()], before[..]);
        assert_eq!(after.last().unwrap().name.as_str(), "Bob");
    }

    #[tokio::test]
    async fn test_roll_count_ignores_coffee_only() {
        let roster = store().await;
        roster.add_signup("Alice", bringing("Brötchen")).await.unwrap();
        roster
            .add_signup("Bob", Participation::CoffeeOnly)
            .await
            .unwrap();

        let signups = roster.list_signups().await.unwrap();
        assert_eq!(brunch_core::required_roll_count(&signups), 1);
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected() {
        let roster = store().await;
        for name in ["", "   ", "Robert'); DROP TABLE signups;--"] {
            let err = roster
                .add_signup(name, Participation::CoffeeOnly)
                .await
                .unwrap_err();
            assert!(matches!(err, RosterError::InvalidName(_)), "{name:?}");
        }
        assert!(roster.list_signups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let roster = store().await;
        roster
            .add_signup("Alice", Participation::CoffeeOnly)
            .await
            .unwrap();

        let err = roster
            .add_signup(" alice ", bringing("Obst"))
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateName(_)));
        assert_eq!(roster.list_signups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_signup_only_removes_named() {
        let roster = store().await;
        roster
            .add_signup("Alice", Participation::CoffeeOnly)
            .await
            .unwrap();
        roster
            .add_signup("Bob", Participation::CoffeeOnly)
            .await
            .unwrap();

        assert!(roster.remove_signup("Alice").await.unwrap());
        assert!(!roster.remove_signup("Alice").await.unwrap());

        let names: Vec<_> = roster
            .list_signups()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name.into_inner())
            .collect();
        assert_eq!(names, vec!["Bob"]);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let roster = store().await;
        roster
            .add_signup("Alice", Participation::CoffeeOnly)
            .await
            .unwrap();

        assert_eq!(roster.clear().await.unwrap(), 1);
        assert_eq!(roster.clear().await.unwrap(), 0);
        assert!(roster.list_signups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_contribution_enters_catalog_and_is_taken() {
        let roster = store().await;
        roster
            .add_catalog_item(&ItemName::parse("Käse").unwrap())
            .await
            .unwrap();
        roster.add_signup("Alice", bringing("Rührei")).await.unwrap();

        let catalog: Vec<_> = ItemRepository::new(&roster.pool)
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name.into_inner())
            .collect();
        assert_eq!(catalog, vec!["Käse", "Rührei"]);

        let available: Vec<_> = roster
            .available_items()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name.into_inner())
            .collect();
        assert_eq!(available, vec!["Käse"]);
    }

    #[tokio::test]
    async fn test_seed_catalog() {
        let roster = store().await;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Brötchen\n\nKaffee\nBad <item>\nBrötchen").unwrap();

        assert_eq!(roster.seed_catalog(file.path()).await.unwrap(), 2);
        assert_eq!(roster.seed_catalog(file.path()).await.unwrap(), 0);
        assert_eq!(
            roster
                .seed_catalog(Path::new("/nonexistent/mitbringsel.txt"))
                .await
                .unwrap(),
            0
        );
    }
}
