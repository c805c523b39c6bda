//! Business logic services for the storefront.
//!
//! Each backend sits behind a trait so the router can be exercised with
//! in-memory fakes:
//!
//! - [`Catalog`] - active products and categories
//! - [`CustomerDirectory`] - customer lookup-or-create and address book
//! - [`OrderLedger`] - orders and payment intents
//! - [`PaymentGateway`] - the external payment provider
//!
//! [`CheckoutService`] orchestrates them.

pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod orders;
pub mod payment;

pub use catalog::{Catalog, PgCatalog};
pub use checkout::{CheckoutError, CheckoutService};
pub use customers::{CustomerDirectory, PgCustomerDirectory};
pub use orders::{OrderLedger, PgOrderLedger};
pub use payment::{HttpPaymentGateway, PaymentError, PaymentGateway};
