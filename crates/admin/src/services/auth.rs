//! Backoffice authentication.
//!
//! Admins log in with email and password (Argon2id hashes) and receive an
//! HS256 bearer token. Tokens are self-contained: the extractors in
//! [`crate::middleware::auth`] only check the signature and expiry.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use nature_de_pierre_core::{AdminRole, AdminUserId, Email, EmailError};

use crate::config::JwtConfig;
use crate::db::{AdminUserRepository, RepositoryError};
use crate::models::{AdminUser, CurrentAdmin};

/// Minimum password length for backoffice accounts.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong password or unknown account.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Bearer token is malformed, badly signed or expired.
    #[error("invalid token")]
    InvalidToken,

    /// Token could not be signed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    role: AdminRole,
    iat: i64,
    exp: i64,
}

/// A signed bearer token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Body of a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub admin: AdminUser,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let key = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            ttl: TimeDelta::from_std(config.ttl).unwrap_or(TimeDelta::hours(8)),
        }
    }

    /// Sign a token for `admin`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, admin: &CurrentAdmin) -> Result<IssuedToken, AuthError> {
        self.issue_at(admin, Utc::now())
    }

    fn issue_at(&self, admin: &CurrentAdmin, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: admin.id.to_string(),
            email: admin.email.clone(),
            role: admin.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Check a bearer token and return the admin it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any signature, format or expiry failure.
    pub fn verify(&self, token: &str) -> Result<CurrentAdmin, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        let id: AdminUserId = data
            .claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(CurrentAdmin {
            id,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    admins: AdminUserRepository<'a>,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenIssuer) -> Self {
        Self {
            admins: AdminUserRepository::new(pool),
            tokens,
        }
    }

    /// Check credentials and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a wrong
    /// password; the two cases are indistinguishable to the caller.
    /// Returns `AuthError::Repository` if the lookup fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (admin, hash) = self
            .admins
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &hash)?;

        let issued = self.tokens.issue(&CurrentAdmin::from(&admin))?;
        self.admins.touch_last_login(admin.id).await?;
        info!(admin_id = %admin.id, "Admin logged in");

        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            admin,
        })
    }

    /// Create a backoffice account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` for bad input.
    /// Returns `AuthError::Repository` with `Conflict` if the email is taken.
    pub async fn create_admin(
        &self,
        email: &str,
        name: &str,
        role: AdminRole,
        password: &str,
    ) -> Result<AdminUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let hash = hash_password(password)?;
        Ok(self.admins.create(&email, name.trim(), role, &hash).await?)
    }
}

/// Check a new password against the backoffice rules.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the first failed rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.trim().len() != password.len() {
        return Err(AuthError::WeakPassword(
            "password must not start or end with whitespace".to_owned(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&JwtConfig {
            secret: SecretString::from(secret),
            ttl: Duration::from_secs(8 * 60 * 60),
        })
    }

    fn viewer() -> CurrentAdmin {
        CurrentAdmin {
            id: AdminUserId::new(7),
            email: "claire@naturedepierre.fr".to_owned(),
            role: AdminRole::Viewer,
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let tokens = issuer("q7Lm2vX9pR4tZ8wK1nB6yH3cF5jD0sGe");
        let issued = tokens.issue(&viewer()).unwrap();
        assert!(issued.expires_at > Utc::now());
        assert_eq!(tokens.verify(&issued.token).unwrap(), viewer());
    }

    #[test]
    fn test_token_rejected_with_other_key() {
        let issued = issuer("q7Lm2vX9pR4tZ8wK1nB6yH3cF5jD0sGe")
            .issue(&viewer())
            .unwrap();
        let other = issuer("Zr8yN1cV5bQ3xW7mK2pL9tH4gF6dS0aJ");
        assert!(matches!(other.verify(&issued.token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = issuer("q7Lm2vX9pR4tZ8wK1nB6yH3cF5jD0sGe");
        let issued = tokens
            .issue_at(&viewer(), Utc::now() - TimeDelta::hours(9))
            .unwrap();
        assert!(matches!(tokens.verify(&issued.token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let tokens = issuer("q7Lm2vX9pR4tZ8wK1nB6yH3cF5jD0sGe");
        assert!(tokens.verify("not.a.jwt").is_err());
        assert!(tokens.verify("").is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("granit-rose-de-ploumanach").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("granit-rose-de-ploumanach", &hash).is_ok());
        assert!(matches!(
            verify_password("granit-gris", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_against_malformed_hash() {
        assert!(matches!(
            verify_password("whatever", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password(" leading-space-pass").is_err());
        assert!(validate_password("ardoise-d-angers-2026").is_ok());
    }
}
