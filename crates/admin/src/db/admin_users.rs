//! Admin user repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use nature_de_pierre_core::{AdminRole, AdminUserId, Email};

use super::RepositoryError;
use crate::models::AdminUser;

// =============================================================================
// Internal Row Types
// =============================================================================

const COLUMNS: &str = "id, email, name, role, last_login_at, created_at, updated_at";

/// Internal row type for `PostgreSQL` admin user queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminUserRow {
    id: AdminUserId,
    email: String,
    name: String,
    role: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| RepositoryError::corrupt("email", e))?;
        let role: AdminRole = row
            .role
            .parse()
            .map_err(|e| RepositoryError::corrupt("admin role", e))?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            role,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: AdminUserRow,
    password_hash: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an admin user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        let row: Option<AdminUserRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM admin.admin_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Get an admin user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let row: Option<CredentialsRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS}, password_hash FROM admin.admin_user WHERE lower(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((AdminUser::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create a new admin user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        role: AdminRole,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let row: AdminUserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO admin.admin_user (email, name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(name)
        .bind(role.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "email already registered"))?;

        row.try_into()
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: AdminUserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE admin.admin_user SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
