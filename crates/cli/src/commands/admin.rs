//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Password from the environment
//! NDP_ADMIN_PASSWORD='...' ndp-cli admin create -e claire@naturedepierre.fr -n "Claire" -r admin
//!
//! # Password from stdin
//! ndp-cli admin create -e claire@naturedepierre.fr -n "Claire" -r viewer < password.txt
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `NDP_ADMIN_PASSWORD` - Password of the new account; read from stdin when unset

use std::io::BufRead;

use secrecy::{ExposeSecret, SecretString};

use nature_de_pierre_admin::db::AdminUserRepository;
use nature_de_pierre_admin::services::auth::{hash_password, validate_password};
use nature_de_pierre_core::{AdminRole, AdminUserId, Email};

use super::{CliError, connect};

const PASSWORD_ENV: &str = "NDP_ADMIN_PASSWORD";

fn read_password() -> Result<SecretString, CliError> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(password));
    }

    tracing::info!("{PASSWORD_ENV} not set, reading password from stdin");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|source| CliError::Read {
            path: "stdin".to_owned(),
            source,
        })?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_owned()))
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `role` - Admin's role (`admin` or `viewer`)
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns `CliError` for an invalid role, email or password, an email that
/// is already registered, or a database failure.
pub async fn create_user(email: &str, name: &str, role: &str) -> Result<AdminUserId, CliError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| CliError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email)?;

    let password = read_password()?;
    validate_password(password.expose_secret())?;
    let hash = hash_password(password.expose_secret())?;

    let pool = connect("ADMIN_DATABASE_URL").await?;
    tracing::info!("Creating admin user: {} ({})", email, role);

    let admin = AdminUserRepository::new(&pool)
        .create(&email, name.trim(), role, &hash)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );
    Ok(admin.id)
}
