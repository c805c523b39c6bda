//! Order ledger: orders and their payment intents.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use nature_de_pierre_core::order::{NewOrder, Order};
use nature_de_pierre_core::payment::{
    PaymentEvent, PaymentEventOutcome, PaymentIntent, PaymentSession,
};
use nature_de_pierre_core::{Currency, OrderId};

use crate::db::{OrderRepository, PaymentIntentRepository, RepositoryError};

#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Persist an order and its lines atomically, in `pending_payment`.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Cancel an unpaid order. `false` when the order is missing or already paid.
    async fn cancel_order(&self, id: OrderId) -> Result<bool, RepositoryError>;

    async fn record_payment_intent(
        &self,
        order_id: OrderId,
        session: &PaymentSession,
        amount: Decimal,
        currency: Currency,
    ) -> Result<PaymentIntent, RepositoryError>;

    /// Apply a provider event to the intent and its order.
    async fn apply_payment_event(
        &self,
        event: &PaymentEvent,
    ) -> Result<PaymentEventOutcome, RepositoryError>;
}

/// `PostgreSQL` order ledger.
#[derive(Clone)]
pub struct PgOrderLedger {
    pool: PgPool,
}

impl PgOrderLedger {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderLedger for PgOrderLedger {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).create(order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get(id).await
    }

    async fn cancel_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        OrderRepository::new(&self.pool).cancel_unpaid(id).await
    }

    async fn record_payment_intent(
        &self,
        order_id: OrderId,
        session: &PaymentSession,
        amount: Decimal,
        currency: Currency,
    ) -> Result<PaymentIntent, RepositoryError> {
        PaymentIntentRepository::new(&self.pool)
            .create(order_id, session, amount, currency)
            .await
    }

    async fn apply_payment_event(
        &self,
        event: &PaymentEvent,
    ) -> Result<PaymentEventOutcome, RepositoryError> {
        PaymentIntentRepository::new(&self.pool)
            .apply_event(event)
            .await
    }
}
