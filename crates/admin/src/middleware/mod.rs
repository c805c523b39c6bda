//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. CORS (configured backoffice origin)
//! 3. Request ID (`x-request-id`, generated when absent and echoed back)
//! 4. `TraceLayer` (request spans)
//! 5. Security headers
//! 6. Rate limiting on login (governor)
//! 7. Bearer token extractors on every other API route

pub mod auth;
pub mod rate_limit;

pub use auth::{RequireAdmin, RequireWriter};
pub use rate_limit::login_rate_limiter;
