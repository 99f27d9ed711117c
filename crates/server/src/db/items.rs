//! Contribution catalog ("Mitbringsel") database operations.

use sqlx::SqlitePool;

use brunch_core::{ItemId, ItemName};

use super::RepositoryError;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CatalogItem {
    /// Row ID.
    pub id: ItemId,
    /// Item name.
    pub name: ItemName,
}

/// Repository for the contribution catalog.
pub struct ItemRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Add an item unless an item of that name (case-insensitive) exists.
    ///
    /// Returns `true` if the item was inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_if_absent(&self, name: &ItemName) -> Result<bool, RepositoryError> {
        let result = sqlx::query("INSERT OR IGNORE INTO contribution_items (name) VALUES (?1)")
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All catalog items in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CatalogItem>(
            "SELECT id, name FROM contribution_items ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Catalog items nobody in the current roster has claimed yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_available(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CatalogItem>(
            r"
            SELECT i.id, i.name
            FROM contribution_items i
            WHERE NOT EXISTS (
                SELECT 1 FROM signups s
                WHERE s.contribution = i.name COLLATE NOCASE
            )
            ORDER BY i.id
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }
}
