//! Orders and order lines.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartItem, CartTotals};
use crate::customer::AddressSnapshot;
use crate::{Currency, CustomerId, OrderId, OrderItemId, OrderStatus, ProductId, VatRate};

/// Prefix of human-readable order references.
pub const REFERENCE_PREFIX: &str = "NDP";

/// Build an order reference such as `NDP-20260314-000042`.
#[must_use]
pub fn order_reference(date: NaiveDate, sequence: i64) -> String {
    format!(
        "{REFERENCE_PREFIX}-{}-{:06}",
        date.format("%Y%m%d"),
        sequence.rem_euclid(1_000_000)
    )
}

/// A placed order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub reference: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_ht: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_vat: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_ttc: Decimal,
    pub currency: Currency,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One order line, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price_ht: Decimal,
    pub vat_rate: VatRate,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_ht: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_ttc: Decimal,
}

/// Order row for backoffice listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub reference: String,
    pub customer_id: CustomerId,
    pub customer_email: String,
    pub customer_name: String,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_ttc: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A line to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price_ht: Decimal,
    pub vat_rate: VatRate,
    pub quantity: i32,
    pub total_ht: Decimal,
    pub total_ttc: Decimal,
}

impl From<&CartItem> for NewOrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.name.clone(),
            unit_price_ht: item.unit_price_ht,
            vat_rate: item.vat_rate,
            quantity: i32::try_from(item.quantity).unwrap_or(i32::MAX),
            total_ht: item.line_total_ht,
            total_ttc: item.line_total_ttc,
        }
    }
}

/// Errors building an order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("cannot place an order for an empty cart")]
    EmptyCart,

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// An order to insert, built from a priced cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub totals: CartTotals,
    pub currency: Currency,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    /// Freeze a cart into an order.
    ///
    /// # Errors
    ///
    /// [`OrderError::EmptyCart`] when the cart has no lines.
    pub fn from_cart(
        customer_id: CustomerId,
        cart: &Cart,
        shipping_address: AddressSnapshot,
        billing_address: AddressSnapshot,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let mut priced = cart.clone();
        priced.recompute();
        Ok(Self {
            customer_id,
            totals: priced.totals,
            currency: Currency::EUR,
            shipping_address,
            billing_address,
            lines: priced.items.iter().map(NewOrderLine::from).collect(),
        })
    }
}

/// Body of `PATCH /orders/{id}/status`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

impl OrderStatusUpdate {
    /// Check that a backoffice user may apply this update.
    ///
    /// # Errors
    ///
    /// [`OrderError::InvalidTransition`] for moves outside the manual set.
    pub const fn check(self, current: OrderStatus) -> Result<(), OrderError> {
        if current.is_manual_transition(self.status) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                from: current,
                to: self.status,
            })
        }
    }
}

/// Backoffice order listing filters.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<CustomerId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::cart::ProductSnapshot;

    fn snapshot() -> AddressSnapshot {
        AddressSnapshot {
            first_name: "Marie".into(),
            last_name: "Dupont".into(),
            company: None,
            line1: "1 place Bellecour".into(),
            line2: None,
            postal_code: "69002".into(),
            city: "Lyon".into(),
            country: "FR".into(),
            phone: None,
        }
    }

    #[test]
    fn test_reference_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(order_reference(date, 42), "NDP-20260314-000042");
        assert_eq!(order_reference(date, 1_000_001), "NDP-20260314-000001");
    }

    #[test]
    fn test_from_cart_copies_lines_and_totals() {
        let mut cart = Cart::empty("owner");
        cart.add_item(
            ProductSnapshot {
                product_id: ProductId::new(7),
                name: "Citrine".into(),
                unit_price_ht: dec!(15),
                vat_rate: VatRate::STANDARD,
                image_url: None,
            },
            2,
        )
        .unwrap();

        let order =
            NewOrder::from_cart(CustomerId::new(1), &cart, snapshot(), snapshot()).unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(order.lines[0].total_ttc, dec!(36));
        assert_eq!(order.totals.total_ttc, dec!(36));
        assert_eq!(order.currency, Currency::EUR);
    }

    #[test]
    fn test_from_empty_cart_fails() {
        let cart = Cart::empty("owner");
        assert_eq!(
            NewOrder::from_cart(CustomerId::new(1), &cart, snapshot(), snapshot()),
            Err(OrderError::EmptyCart)
        );
    }

    #[test]
    fn test_manual_status_update() {
        let ship = OrderStatusUpdate {
            status: OrderStatus::Shipped,
        };
        assert!(ship.check(OrderStatus::Paid).is_ok());
        assert!(ship.check(OrderStatus::PendingPayment).is_err());

        let pay = OrderStatusUpdate {
            status: OrderStatus::Paid,
        };
        assert!(pay.check(OrderStatus::PendingPayment).is_err());
    }
}
