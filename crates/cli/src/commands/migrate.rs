//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ndp-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string shared by both servers
//!
//! # Migration Files
//!
//! All schemas (`catalog`, `crm`, `sales`, `admin`) are migrated from
//! `migrations/` at the workspace root, in file name order:
//! ```text
//! migrations/
//! ├── 20260301000001_create_catalog.sql
//! ├── 20260301000002_create_crm.sql
//! ├── 20260301000003_create_sales.sql
//! └── 20260301000004_create_admin.sql
//! ```

use super::{CliError, connect};

/// Apply pending migrations.
///
/// # Errors
///
/// Returns `CliError` if the connection fails or a migration does not apply.
pub async fn run() -> Result<(), CliError> {
    let pool = connect("DATABASE_URL").await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../../migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
