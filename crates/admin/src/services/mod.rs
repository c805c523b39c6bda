//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Password login and bearer tokens
//! - `uploads` - Product image validation and storage

pub mod auth;
pub mod uploads;

pub use auth::{AuthError, AuthService, IssuedToken, LoginResponse, TokenIssuer};
pub use uploads::{ImageFormat, MAX_IMAGE_BYTES, UploadError};
