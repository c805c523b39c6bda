//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. CORS (configured UI origin)
//! 3. `TraceLayer` (request spans)
//! 4. Request ID
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting on checkout routes (governor)

pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use rate_limit::checkout_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{CartOwner, create_session_layer};
