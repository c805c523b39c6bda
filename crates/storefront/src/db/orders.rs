//! Orders and payment intents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::warn;

use nature_de_pierre_core::customer::AddressSnapshot;
use nature_de_pierre_core::order::{NewOrder, Order, OrderItem, order_reference};
use nature_de_pierre_core::payment::{
    PaymentEvent, PaymentEventOutcome, PaymentIntent, PaymentSession,
};
use nature_de_pierre_core::{
    Currency, CustomerId, OrderId, OrderItemId, OrderStatus, PaymentIntentId, PaymentStatus,
    ProductId, VatRate,
};

use super::RepositoryError;

const ORDER_COLUMNS: &str = "id, reference, customer_id, status, total_ht, total_vat, total_ttc, \
     currency, shipping_address, billing_address, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, unit_price_ht, vat_rate, \
     quantity, total_ht, total_ttc";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    reference: String,
    customer_id: CustomerId,
    status: String,
    total_ht: Decimal,
    total_vat: Decimal,
    total_ttc: Decimal,
    currency: String,
    shipping_address: Json<AddressSnapshot>,
    billing_address: Json<AddressSnapshot>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: self.id,
            reference: self.reference,
            customer_id: self.customer_id,
            status: parse_order_status(&self.status)?,
            total_ht: self.total_ht,
            total_vat: self.total_vat,
            total_ttc: self.total_ttc,
            currency: parse_currency(&self.currency)?,
            shipping_address: self.shipping_address.0,
            billing_address: self.billing_address.0,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    unit_price_ht: Decimal,
    vat_rate: VatRate,
    quantity: i32,
    total_ht: Decimal,
    total_ttc: Decimal,
}

impl From<ItemRow> for OrderItem {
    fn from(r: ItemRow) -> Self {
        Self {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            product_name: r.product_name,
            unit_price_ht: r.unit_price_ht,
            vat_rate: r.vat_rate,
            quantity: r.quantity,
            total_ht: r.total_ht,
            total_ttc: r.total_ttc,
        }
    }
}

fn parse_order_status(raw: &str) -> Result<OrderStatus, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::corrupt("order status", e))
}

fn parse_payment_status(raw: &str) -> Result<PaymentStatus, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::corrupt("payment status", e))
}

fn parse_currency(raw: &str) -> Result<Currency, RepositoryError> {
    raw.trim()
        .parse()
        .map_err(|e: String| RepositoryError::corrupt("currency", e))
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is
    /// written in that case.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sequence: i64 = sqlx::query_scalar("SELECT nextval('sales.order_reference_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let reference = order_reference(Utc::now().date_naive(), sequence);

        let row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO sales.customer_order
                (reference, customer_id, status, total_ht, total_vat, total_ttc, currency,
                 shipping_address, billing_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&reference)
        .bind(order.customer_id)
        .bind(OrderStatus::PendingPayment.as_str())
        .bind(order.totals.total_ht)
        .bind(order.totals.total_vat)
        .bind(order.totals.total_ttc)
        .bind(order.currency.code())
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.billing_address))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique(e, "order reference already exists"))?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let item: ItemRow = sqlx::query_as(&format!(
                r"
                INSERT INTO sales.order_item
                    (order_id, product_id, product_name, unit_price_ht, vat_rate, quantity,
                     total_ht, total_ttc)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {ITEM_COLUMNS}
                "
            ))
            .bind(row.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.unit_price_ht)
            .bind(line.vat_rate)
            .bind(line.quantity)
            .bind(line.total_ht)
            .bind(line.total_ttc)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(item));
        }

        tx.commit().await?;
        row.into_order(items)
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is unknown.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM sales.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM sales.order_item WHERE order_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        row.into_order(items.into_iter().map(OrderItem::from).collect())
            .map(Some)
    }

    /// Cancel an order that has not been paid.
    ///
    /// Returns `false` when the order is missing or already past payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cancel_unpaid(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE sales.customer_order
            SET status = 'cancelled', updated_at = now()
            WHERE id = $1 AND status IN ('pending_payment', 'payment_failed')
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(sqlx::FromRow)]
struct IntentRow {
    id: PaymentIntentId,
    order_id: OrderId,
    provider_payment_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    payment_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IntentRow> for PaymentIntent {
    type Error = RepositoryError;

    fn try_from(r: IntentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            order_id: r.order_id,
            provider_payment_id: r.provider_payment_id,
            amount: r.amount,
            currency: parse_currency(&r.currency)?,
            status: parse_payment_status(&r.status)?,
            payment_url: r.payment_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Repository for payment intents.
pub struct PaymentIntentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentIntentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a payment session opened with the provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the provider payment id is already recorded.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        order_id: OrderId,
        session: &PaymentSession,
        amount: Decimal,
        currency: Currency,
    ) -> Result<PaymentIntent, RepositoryError> {
        let row: IntentRow = sqlx::query_as(
            r"
            INSERT INTO sales.payment_intent
                (order_id, provider_payment_id, amount, currency, status, payment_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, order_id, provider_payment_id, amount, currency, status,
                      payment_url, created_at, updated_at
            ",
        )
        .bind(order_id)
        .bind(&session.payment_id)
        .bind(amount)
        .bind(currency.code())
        .bind(session.status.as_str())
        .bind(&session.payment_url)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "payment already recorded"))?;

        row.try_into()
    }

    /// Apply a provider event to the intent and its order.
    ///
    /// Intents already in a final state are left untouched. The order only
    /// moves when its lifecycle allows the transition.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no intent has this provider id.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn apply_event(
        &self,
        event: &PaymentEvent,
    ) -> Result<PaymentEventOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let intent: Option<(PaymentIntentId, OrderId, String)> = sqlx::query_as(
            r"
            SELECT id, order_id, status
            FROM sales.payment_intent
            WHERE provider_payment_id = $1
            FOR UPDATE
            ",
        )
        .bind(&event.payment_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (intent_id, order_id, status) = intent.ok_or(RepositoryError::NotFound)?;
        if parse_payment_status(&status)?.is_final() {
            return Ok(PaymentEventOutcome::AlreadyFinal);
        }
        let Some(target) = event.status.order_status() else {
            return Ok(PaymentEventOutcome::Ignored);
        };

        sqlx::query(
            "UPDATE sales.payment_intent SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(intent_id)
        .bind(event.status.as_str())
        .execute(&mut *tx)
        .await?;

        let current: String = sqlx::query_scalar(
            "SELECT status FROM sales.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;
        let current = parse_order_status(&current)?;

        if current.can_transition_to(target) {
            sqlx::query(
                "UPDATE sales.customer_order SET status = $2, updated_at = now() WHERE id = $1",
            )
            .bind(order_id)
            .bind(target.as_str())
            .execute(&mut *tx)
            .await?;
        } else {
            warn!(
                order_id = %order_id,
                from = %current,
                to = %target,
                "Payment event does not apply to order status"
            );
        }

        tx.commit().await?;
        Ok(PaymentEventOutcome::Applied)
    }
}
