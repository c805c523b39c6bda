//! Order listings and manual status changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use thiserror::Error;

use nature_de_pierre_core::customer::AddressSnapshot;
use nature_de_pierre_core::order::{
    Order, OrderError, OrderFilter, OrderItem, OrderStatusUpdate, OrderSummary,
};
use nature_de_pierre_core::pagination::PageQuery;
use nature_de_pierre_core::{
    Currency, CustomerId, OrderId, OrderItemId, OrderStatus, ProductId, VatRate,
};

use super::RepositoryError;

const ORDER_COLUMNS: &str = "id, reference, customer_id, status, total_ht, total_vat, total_ttc, \
     currency, shipping_address, billing_address, created_at, updated_at";

/// Filters shared by the count and page queries; `$1` is the status, `$2` the customer.
const FILTERS: &str = "($1::TEXT IS NULL OR o.status = $1) AND ($2::INTEGER IS NULL OR o.customer_id = $2)";

/// Why a manual status change was refused.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Transition(#[from] OrderError),
}

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
            status: parse_status(&self.status)?,
            total_ht: self.total_ht,
            total_vat: self.total_vat,
            total_ttc: self.total_ttc,
            currency: self
                .currency
                .trim()
                .parse::<Currency>()
                .map_err(|e| RepositoryError::corrupt("currency", e))?,
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

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: OrderId,
    reference: String,
    customer_id: CustomerId,
    customer_email: String,
    customer_name: String,
    status: String,
    total_ttc: Decimal,
    item_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(r: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            reference: r.reference,
            customer_id: r.customer_id,
            customer_email: r.customer_email,
            customer_name: r.customer_name,
            status: parse_status(&r.status)?,
            total_ttc: r.total_ttc,
            item_count: r.item_count,
            created_at: r.created_at,
        })
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::corrupt("order status", e))
}

/// Repository for backoffice order management.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders, newest first, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is unknown.
    pub async fn list(
        &self,
        filter: OrderFilter,
        page: PageQuery,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        let status = filter.status.map(OrderStatus::as_str);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM sales.customer_order o WHERE {FILTERS}"
        ))
        .bind(status)
        .bind(filter.customer_id)
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            r"
            SELECT o.id, o.reference, o.customer_id,
                   c.email AS customer_email,
                   c.first_name || ' ' || c.last_name AS customer_name,
                   o.status, o.total_ttc,
                   (SELECT COUNT(*) FROM sales.order_item i WHERE i.order_id = o.id) AS item_count,
                   o.created_at
            FROM sales.customer_order o
            JOIN crm.customer c ON c.id = o.customer_id
            WHERE {FILTERS}
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(status)
        .bind(filter.customer_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let summaries = rows
            .into_iter()
            .map(OrderSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((summaries, total))
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
        let items = self.items(id).await?;
        row.into_order(items).map(Some)
    }

    async fn items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT id, order_id, product_id, product_name, unit_price_ht, vat_rate,
                   quantity, total_ht, total_ttc
            FROM sales.order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    /// Apply a manual status change.
    ///
    /// The order row is locked while the transition is checked, so a
    /// concurrent payment callback cannot slip in between.
    ///
    /// # Errors
    ///
    /// Returns `StatusChangeError::Transition` for moves outside the manual set.
    /// Returns `StatusChangeError::Repository` with `NotFound` if the order
    /// does not exist, or with the database error.
    pub async fn update_status(
        &self,
        id: OrderId,
        update: OrderStatusUpdate,
    ) -> Result<Order, StatusChangeError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let current: Option<String> = sqlx::query_scalar(
            "SELECT status FROM sales.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;
        let current = parse_status(&current.ok_or(RepositoryError::NotFound)?)?;

        update.check(current)?;

        let row: OrderRow = sqlx::query_as(&format!(
            r"
            UPDATE sales.customer_order
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        tx.commit().await.map_err(RepositoryError::from)?;

        let items = self.items(id).await?;
        Ok(row.into_order(items)?)
    }
}
