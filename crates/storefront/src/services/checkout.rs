//! Checkout orchestration.
//!
//! Turns a session cart into an order and a payment session:
//!
//! 1. validate the request (nothing is written on failure)
//! 2. claim the cart, so a concurrent checkout of it gets a 409
//! 3. load the cart, which must not be empty
//! 4. find or create the customer by email
//! 5. save the addresses to the address book (best effort)
//! 6. re-price the cart against the live catalog and create the order
//! 7. open a payment session; on failure the order is cancelled and the
//!    cart is kept
//! 8. take the ordered lines out of the cart (best effort); lines added
//!    while the checkout ran stay in the cart
//!
//! Steps 4, 6 and 7 are critical and abort the checkout. Steps 5 and 8 only
//! log a warning when they fail. The claim is released on every path.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use nature_de_pierre_core::cart::{Cart, CartError, ProductSnapshot};
use nature_de_pierre_core::catalog::Product;
use nature_de_pierre_core::checkout::{CheckoutRequest, CheckoutResponse};
use nature_de_pierre_core::customer::Customer;
use nature_de_pierre_core::order::{NewOrder, Order, OrderError};
use nature_de_pierre_core::payment::{PaymentIntent, PaymentSessionRequest};
use nature_de_pierre_core::validation::ValidationErrors;
use nature_de_pierre_core::{OrderId, OrderStatus, ProductId};

use crate::cart::{CartService, CartServiceError};
use crate::db::RepositoryError;
use crate::services::catalog::Catalog;
use crate::services::customers::CustomerDirectory;
use crate::services::orders::OrderLedger;
use crate::services::payment::{PaymentError, PaymentGateway};

/// Errors that abort a checkout or a payment session request.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("cart is empty")]
    EmptyCart,

    /// Cart lines whose product is no longer sold.
    #[error("products no longer available: {0:?}")]
    ProductUnavailable(Vec<ProductId>),

    #[error("order not found")]
    OrderNotFound,

    #[error("order {0} cannot be paid in status {1}")]
    OrderNotPayable(OrderId, OrderStatus),

    #[error(transparent)]
    Cart(#[from] CartServiceError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl From<CartError> for CheckoutError {
    fn from(e: CartError) -> Self {
        Self::Cart(CartServiceError::Cart(e))
    }
}

impl From<OrderError> for CheckoutError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::EmptyCart => Self::EmptyCart,
            OrderError::InvalidTransition { from, .. } => {
                Self::Repository(RepositoryError::Conflict(format!(
                    "order status {from} cannot change"
                )))
            }
        }
    }
}

/// Backends the checkout talks to.
#[derive(Clone)]
pub struct CheckoutService {
    carts: CartService,
    catalog: Arc<dyn Catalog>,
    customers: Arc<dyn CustomerDirectory>,
    orders: Arc<dyn OrderLedger>,
    payments: Arc<dyn PaymentGateway>,
    base_url: String,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        carts: CartService,
        catalog: Arc<dyn Catalog>,
        customers: Arc<dyn CustomerDirectory>,
        orders: Arc<dyn OrderLedger>,
        payments: Arc<dyn PaymentGateway>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            carts,
            catalog,
            customers,
            orders,
            payments,
            base_url: base_url.into(),
        }
    }

    /// Run a checkout for the cart owned by `owner`.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]. When the payment session cannot be opened the
    /// order has already been cancelled and the cart is untouched. A second
    /// checkout of the same cart while this one runs fails with
    /// [`CartServiceError::CheckoutInProgress`].
    #[instrument(skip(self, request))]
    pub async fn checkout(
        &self,
        owner: &str,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, CheckoutError> {
        request.validate()?;

        let claim = self.carts.begin_checkout(owner).await?;
        let placed = self.place_order(owner, request).await;
        if let Err(e) = self.carts.end_checkout(&claim).await {
            warn!(error = %e, "Failed to release checkout claim");
        }
        placed
    }

    async fn place_order(
        &self,
        owner: &str,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, CheckoutError> {
        let ordered = self.carts.snapshot(owner).await?;
        let cart = &ordered.cart;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let new_customer = request.customer.clone().into_new()?;
        let (customer, created) = self.customers.find_or_create(&new_customer).await?;
        info!(customer_id = %customer.id, created, "Checkout customer resolved");

        self.save_addresses(&customer, request).await;

        let ids: Vec<ProductId> = cart.items.iter().map(|i| i.product_id).collect();
        let current = self.catalog.current_products(&ids).await?;
        let priced = reprice(cart, &current)?;

        let (shipping, billing) = request.snapshots();
        let new_order = NewOrder::from_cart(customer.id, &priced, shipping, billing)?;
        let order = self.orders.create_order(&new_order).await?;
        info!(order_id = %order.id, reference = %order.reference, "Order created");

        let intent = match self.open_payment(&order, customer.email.as_str()).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "Payment session failed, cancelling order");
                match self.orders.cancel_order(order.id).await {
                    Ok(true) => {}
                    Ok(false) => warn!(order_id = %order.id, "Order was not cancellable"),
                    Err(cancel) => {
                        warn!(order_id = %order.id, error = %cancel, "Failed to cancel order");
                    }
                }
                return Err(e);
            }
        };

        if let Err(e) = self.carts.settle_checkout(owner, &ordered).await {
            warn!(error = %e, "Failed to clear ordered lines from cart");
        }

        Ok(CheckoutResponse {
            order_id: order.id,
            reference: order.reference,
            payment_url: intent.payment_url,
            totals: priced.totals,
        })
    }

    /// Open a new payment session for an unpaid order.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound`, `OrderNotPayable` when the order is past
    /// payment, or the provider/database error.
    #[instrument(skip(self))]
    pub async fn create_payment(&self, order_id: OrderId) -> Result<PaymentIntent, CheckoutError> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;
        if !matches!(
            order.status,
            OrderStatus::PendingPayment | OrderStatus::PaymentFailed
        ) {
            return Err(CheckoutError::OrderNotPayable(order.id, order.status));
        }
        let customer = self
            .customers
            .get(order.customer_id)
            .await?
            .ok_or(CheckoutError::Repository(RepositoryError::DataCorruption(
                format!("order {} has no customer", order.id),
            )))?;
        self.open_payment(&order, customer.email.as_str()).await
    }

    async fn open_payment(
        &self,
        order: &Order,
        customer_email: &str,
    ) -> Result<PaymentIntent, CheckoutError> {
        let request = PaymentSessionRequest {
            order_id: order.id,
            reference: order.reference.clone(),
            amount: order.total_ttc,
            currency: order.currency,
            customer_email: customer_email.to_owned(),
            return_url: format!("{}/checkout/confirmation?orderId={}", self.base_url, order.id),
            cancel_url: format!("{}/checkout/cancelled?orderId={}", self.base_url, order.id),
        };
        let session = self.payments.create_session(&request).await?;
        let intent = self
            .orders
            .record_payment_intent(order.id, &session, order.total_ttc, order.currency)
            .await?;
        Ok(intent)
    }

    async fn save_addresses(&self, customer: &Customer, request: &CheckoutRequest) {
        if let Err(e) = self
            .customers
            .save_address(customer.id, &request.shipping())
            .await
        {
            warn!(customer_id = %customer.id, error = %e, "Failed to save shipping address");
        }
        if request.has_distinct_billing()
            && let Err(e) = self
                .customers
                .save_address(customer.id, &request.billing())
                .await
        {
            warn!(customer_id = %customer.id, error = %e, "Failed to save billing address");
        }
    }
}

/// Rebuild a cart with live catalog data, keeping quantities.
///
/// # Errors
///
/// [`CheckoutError::ProductUnavailable`] listing every line whose product
/// is missing from `current`.
pub fn reprice(cart: &Cart, current: &[Product]) -> Result<Cart, CheckoutError> {
    let by_id: HashMap<ProductId, &Product> = current.iter().map(|p| (p.id, p)).collect();

    let missing: Vec<ProductId> = cart
        .items
        .iter()
        .map(|i| i.product_id)
        .filter(|id| !by_id.contains_key(id))
        .collect();
    if !missing.is_empty() {
        return Err(CheckoutError::ProductUnavailable(missing));
    }

    let mut priced = Cart::empty(cart.customer_id.clone());
    for item in &cart.items {
        if let Some(product) = by_id.get(&item.product_id) {
            priced.add_item(ProductSnapshot::from(*product), item.quantity)?;
        }
    }
    Ok(priced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use nature_de_pierre_core::VatRate;

    use super::*;

    fn product(id: i32, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            sku: None,
            name: format!("Pierre {id}"),
            description: None,
            category_id: None,
            price_ht: price,
            vat_rate: VatRate::STANDARD,
            stock_quantity: 5,
            image_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart_with(products: &[(Product, u32)]) -> Cart {
        let mut cart = Cart::empty("owner");
        for (p, qty) in products {
            cart.add_item(ProductSnapshot::from(p), *qty).unwrap();
        }
        cart
    }

    #[test]
    fn test_reprice_uses_current_prices() {
        let cart = cart_with(&[(product(1, dec!(10)), 2)]);
        let priced = reprice(&cart, &[product(1, dec!(12.50))]).unwrap();
        assert_eq!(priced.items[0].quantity, 2);
        assert_eq!(priced.items[0].unit_price_ht, dec!(12.50));
        assert_eq!(priced.totals.total_ht, dec!(25.00));
        assert_eq!(priced.totals.total_ttc, dec!(30.00));
    }

    #[test]
    fn test_reprice_reports_every_missing_product() {
        let cart = cart_with(&[
            (product(1, dec!(10)), 1),
            (product(2, dec!(5)), 1),
            (product(3, dec!(7)), 1),
        ]);
        let err = reprice(&cart, &[product(2, dec!(5))]).unwrap_err();
        match err {
            CheckoutError::ProductUnavailable(ids) => {
                assert_eq!(ids, vec![ProductId::new(1), ProductId::new(3)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reprice_keeps_owner() {
        let cart = cart_with(&[(product(1, dec!(10)), 1)]);
        let priced = reprice(&cart, &[product(1, dec!(10))]).unwrap();
        assert_eq!(priced.customer_id, "owner");
    }
}
