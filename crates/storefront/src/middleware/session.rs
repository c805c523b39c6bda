//! Session layer and session-backed extractors.
//!
//! Sessions are stored in `PostgreSQL` by tower-sessions. A visitor's session
//! holds two things:
//!
//! - `cart_owner` - random id keying the visitor's cart in the cart store
//! - `placed_orders` - ids of the orders placed from this session, which
//!   gates the order confirmation endpoint

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use uuid::Uuid;

use nature_de_pierre_core::OrderId;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ndp_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Session keys.
pub mod session_keys {
    pub const CART_OWNER: &str = "cart_owner";
    pub const PLACED_ORDERS: &str = "placed_orders";
}

/// Orders remembered per session.
const MAX_PLACED_ORDERS: usize = 20;

/// Create the session layer over `store`.
///
/// Cookies are `Secure` when the storefront is served over HTTPS.
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    config: &StorefrontConfig,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Rejection for session extractors.
#[derive(Debug)]
pub enum SessionRejection {
    /// The session layer is not installed on this route.
    MissingLayer,
    /// The session store failed.
    Store(tower_sessions::session::Error),
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingLayer => {
                tracing::error!("Session layer missing");
            }
            Self::Store(e) => {
                tracing::error!(error = %e, "Session store error");
            }
        }
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(serde_json::json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}

fn session(parts: &Parts) -> Result<Session, SessionRejection> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(SessionRejection::MissingLayer)
}

/// The cart owner id of the current session, created on first use.
///
/// ```rust,ignore
/// async fn get_cart(State(state): State<AppState>, owner: CartOwner) -> Result<Json<Cart>> {
///     Ok(Json(state.carts().get(owner.as_str()).await?))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CartOwner {
    id: String,
    session: Session,
}

impl CartOwner {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Remember an order placed from this session.
    ///
    /// # Errors
    ///
    /// Returns the session store error.
    pub async fn remember_order(&self, order_id: OrderId) -> Result<(), tower_sessions::session::Error> {
        let mut orders = self.placed_orders().await?;
        if !orders.contains(&order_id) {
            orders.push(order_id);
        }
        if orders.len() > MAX_PLACED_ORDERS {
            let excess = orders.len() - MAX_PLACED_ORDERS;
            orders.drain(..excess);
        }
        self.session
            .insert(session_keys::PLACED_ORDERS, orders)
            .await
    }

    /// Whether this session placed the order.
    ///
    /// # Errors
    ///
    /// Returns the session store error.
    pub async fn placed(&self, order_id: OrderId) -> Result<bool, tower_sessions::session::Error> {
        Ok(self.placed_orders().await?.contains(&order_id))
    }

    async fn placed_orders(&self) -> Result<Vec<OrderId>, tower_sessions::session::Error> {
        Ok(self
            .session
            .get::<Vec<OrderId>>(session_keys::PLACED_ORDERS)
            .await?
            .unwrap_or_default())
    }
}

impl<S> FromRequestParts<S> for CartOwner
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session(parts)?;

        let existing: Option<String> = session
            .get(session_keys::CART_OWNER)
            .await
            .map_err(SessionRejection::Store)?;

        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                session
                    .insert(session_keys::CART_OWNER, &id)
                    .await
                    .map_err(SessionRejection::Store)?;
                id
            }
        };

        Ok(Self { id, session })
    }
}
