//! Signup repository for database operations.
//!
//! Rows come back in insertion order (`ORDER BY id`).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use brunch_core::{ItemName, ParticipantName, Participation, Signup, SignupId};

use super::RepositoryError;

/// Raw `signups` row.
#[derive(Debug, sqlx::FromRow)]
struct SignupRow {
    id: SignupId,
    name: ParticipantName,
    contribution: Option<ItemName>,
    coffee_only: bool,
    registered_at: DateTime<Utc>,
}

impl TryFrom<SignupRow> for Signup {
    type Error = RepositoryError;

    fn try_from(row: SignupRow) -> Result<Self, Self::Error> {
        let participation = match (row.coffee_only, row.contribution) {
            (true, None) => Participation::CoffeeOnly,
            (true, Some(item)) => {
                return Err(RepositoryError::DataCorruption(format!(
                    "coffee-only signup {} carries contribution '{item}'",
                    row.id
                )));
            }
            (false, contribution) => Participation::Brunch { contribution },
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            participation,
            registered_at: row.registered_at,
        })
    }
}

/// Repository for signup database operations.
pub struct SignupRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SignupRepository<'a> {
    /// Create a new signup repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a signup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is already registered
    /// (case-insensitive). Returns `RepositoryError::Database` for other
    /// database errors.
    pub async fn create(
        &self,
        name: &ParticipantName,
        participation: &Participation,
        registered_at: DateTime<Utc>,
    ) -> Result<Signup, RepositoryError> {
        let row: SignupRow = sqlx::query_as(
            r"
            INSERT INTO signups (name, contribution, coffee_only, registered_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, name, contribution, coffee_only, registered_at
            ",
        )
        .bind(name)
        .bind(participation.contribution())
        .bind(participation.is_coffee_only())
        .bind(registered_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "participant"))?;

        row.try_into()
    }

    /// List all signups in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is inconsistent.
    pub async fn list(&self) -> Result<Vec<Signup>, RepositoryError> {
        let rows: Vec<SignupRow> = sqlx::query_as(
            r"
            SELECT id, name, contribution, coffee_only, registered_at
            FROM signups
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Signup::try_from).collect()
    }

    /// Check whether a participant is registered (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, name: &ParticipantName) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM signups WHERE name = ?1)")
                .bind(name)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Delete a participant's signup. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_name(&self, name: &ParticipantName) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM signups WHERE name = ?1")
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every signup. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM signups")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
