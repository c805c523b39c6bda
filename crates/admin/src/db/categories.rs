//! Category CRUD.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use nature_de_pierre_core::CategoryId;
use nature_de_pierre_core::catalog::{Category, CategoryInput};

use super::RepositoryError;

const COLUMNS: &str = "id, name, description, image_url, created_at, updated_at";

const NAME_TAKEN: &str = "category name already exists";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            image_url: r.image_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Repository for categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM catalog.category ORDER BY lower(name), id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM catalog.category WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another category has the same
    /// name, ignoring case.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let row: CategoryRow = sqlx::query_as(&format!(
            r"
            INSERT INTO catalog.category (name, description, image_url)
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, NAME_TAKEN))?;
        Ok(row.into())
    }

    /// Replace a category's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            r"
            UPDATE catalog.category
            SET name = $2, description = $3, image_url = $4, updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, NAME_TAKEN))?;
        row.map(Category::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::InUse` if products still belong to it.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::on_delete(e, "category still has products"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
