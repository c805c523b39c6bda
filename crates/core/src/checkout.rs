//! Checkout wizard payloads.
//!
//! The storefront collects checkout data over three steps (customer details,
//! addresses, review). Each step can be validated on its own so the UI can
//! block navigation, and the final submission re-validates everything before
//! anything is written.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cart::CartTotals;
use crate::customer::{AddressInput, AddressSnapshot, CustomerInput};
use crate::validation::ValidationErrors;
use crate::{AddressKind, OrderId};

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Customer,
    Addresses,
    Review,
}

impl CheckoutStep {
    pub const ALL: [Self; 3] = [Self::Customer, Self::Addresses, Self::Review];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Addresses => "addresses",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckoutStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown checkout step: {s}"))
    }
}

/// Checkout submission (and partial wizard state for step validation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer: CustomerInput,
    #[serde(default)]
    pub shipping_address: AddressInput,
    pub billing_address: Option<AddressInput>,
    #[serde(default)]
    pub billing_same_as_shipping: bool,
}

impl CheckoutRequest {
    /// Validate the fields a single wizard step owns.
    ///
    /// `Review` checks the whole request, like the final submission.
    ///
    /// # Errors
    ///
    /// Returns every invalid field with its dotted path.
    pub fn validate_step(&self, step: CheckoutStep) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if matches!(step, CheckoutStep::Customer | CheckoutStep::Review)
            && let Err(nested) = self.customer.validate()
        {
            errors.nest("customer", nested);
        }
        if matches!(step, CheckoutStep::Addresses | CheckoutStep::Review) {
            if let Err(nested) = self.shipping_address.validate() {
                errors.nest("shippingAddress", nested);
            }
            if !self.billing_same_as_shipping {
                match &self.billing_address {
                    Some(billing) => {
                        if let Err(nested) = billing.validate() {
                            errors.nest("billingAddress", nested);
                        }
                    }
                    None => errors.add("billingAddress", "is required"),
                }
            }
        }
        errors.into_result()
    }

    /// Validate the whole request.
    ///
    /// # Errors
    ///
    /// Returns every invalid field with its dotted path.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_step(CheckoutStep::Review)
    }

    /// Normalized shipping address, tagged as such.
    #[must_use]
    pub fn shipping(&self) -> AddressInput {
        self.shipping_address
            .with_kind(AddressKind::Shipping)
            .normalized()
    }

    /// Normalized billing address; the shipping address when they are the same.
    #[must_use]
    pub fn billing(&self) -> AddressInput {
        let source = match (&self.billing_address, self.billing_same_as_shipping) {
            (Some(billing), false) => billing,
            _ => &self.shipping_address,
        };
        source.with_kind(AddressKind::Billing).normalized()
    }

    /// Whether a separate billing address has to be saved.
    #[must_use]
    pub fn has_distinct_billing(&self) -> bool {
        !self.billing_same_as_shipping
            && self
                .billing_address
                .as_ref()
                .is_some_and(|b| b.snapshot() != self.shipping_address.snapshot())
    }

    /// Snapshots (shipping, billing) to freeze on the order.
    #[must_use]
    pub fn snapshots(&self) -> (AddressSnapshot, AddressSnapshot) {
        (self.shipping().snapshot(), self.billing().snapshot())
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub reference: String,
    pub payment_url: String,
    pub totals: CartTotals,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> AddressInput {
        AddressInput {
            first_name: "Marie".into(),
            last_name: "Dupont".into(),
            line1: "12 rue des Lilas".into(),
            postal_code: "69003".into(),
            city: "Lyon".into(),
            ..AddressInput::default()
        }
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            customer: CustomerInput {
                email: "marie@example.fr".into(),
                first_name: "Marie".into(),
                last_name: "Dupont".into(),
                phone: None,
                company: None,
            },
            shipping_address: address(),
            billing_address: None,
            billing_same_as_shipping: true,
        }
    }

    #[test]
    fn test_step_parsing() {
        assert_eq!("addresses".parse::<CheckoutStep>(), Ok(CheckoutStep::Addresses));
        assert!("payment".parse::<CheckoutStep>().is_err());
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_missing_identity_fields_rejected() {
        let mut req = request();
        req.customer.first_name = String::new();
        req.customer.last_name = " ".into();
        req.customer.email = String::new();
        let errors = req.validate().unwrap_err();
        assert!(errors.has("customer.firstName"));
        assert!(errors.has("customer.lastName"));
        assert!(errors.has("customer.email"));
    }

    #[test]
    fn test_customer_step_ignores_addresses() {
        let req = CheckoutRequest {
            customer: request().customer,
            ..CheckoutRequest::default()
        };
        assert!(req.validate_step(CheckoutStep::Customer).is_ok());
        assert!(req.validate_step(CheckoutStep::Addresses).is_err());
    }

    #[test]
    fn test_billing_required_unless_same() {
        let mut req = request();
        req.billing_same_as_shipping = false;
        let errors = req.validate_step(CheckoutStep::Addresses).unwrap_err();
        assert!(errors.has("billingAddress"));

        let mut billing = address();
        billing.city = String::new();
        req.billing_address = Some(billing);
        let errors = req.validate().unwrap_err();
        assert!(errors.has("billingAddress.city"));
    }

    #[test]
    fn test_billing_falls_back_to_shipping() {
        let mut req = request();
        req.billing_address = Some(AddressInput {
            city: "Paris".into(),
            ..address()
        });
        // Flag wins over a provided billing address.
        assert_eq!(req.billing().city, "Lyon");
        assert_eq!(req.billing().kind, AddressKind::Billing);
        assert!(!req.has_distinct_billing());

        req.billing_same_as_shipping = false;
        assert_eq!(req.billing().city, "Paris");
        assert!(req.has_distinct_billing());
    }
}
