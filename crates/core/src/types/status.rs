//! Status enums for orders, payments, addresses and admin roles.
//!
//! Statuses are stored as `TEXT` columns; [`std::str::FromStr`] and `as_str`
//! are the only conversions between the two representations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error for a status string that does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Database and wire representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownStatus {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Order lifecycle.
///
/// ```text
/// pending_payment ─┬─> paid ─┬─> shipped
///                  │         └─> cancelled
///                  ├─> payment_failed ─> cancelled
///                  └─> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    Paid,
    PaymentFailed,
    Cancelled,
    Shipped,
}

text_enum!(OrderStatus, "order status", {
    PendingPayment => "pending_payment",
    Paid => "paid",
    PaymentFailed => "payment_failed",
    Cancelled => "cancelled",
    Shipped => "shipped",
});

impl OrderStatus {
    /// Whether a move from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::PendingPayment,
                Self::Paid | Self::PaymentFailed | Self::Cancelled
            ) | (Self::PaymentFailed, Self::Cancelled | Self::Paid)
                | (Self::Paid, Self::Shipped | Self::Cancelled)
        )
    }

    /// Whether a backoffice user may set this transition by hand.
    ///
    /// Payment outcomes (`paid`, `payment_failed`) only come from the
    /// payment provider.
    #[must_use]
    pub const fn is_manual_transition(self, next: Self) -> bool {
        self.can_transition_to(next) && matches!(next, Self::Cancelled | Self::Shipped)
    }
}

/// Payment intent lifecycle as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Succeeded => "succeeded",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl PaymentStatus {
    /// Final statuses never change again.
    #[must_use]
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The order status a payment outcome moves the order to.
    #[must_use]
    pub const fn order_status(self) -> Option<OrderStatus> {
        match self {
            Self::Pending => None,
            Self::Succeeded => Some(OrderStatus::Paid),
            Self::Failed => Some(OrderStatus::PaymentFailed),
            Self::Cancelled => Some(OrderStatus::Cancelled),
        }
    }
}

/// Which role an address plays in the customer's address book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    #[default]
    Shipping,
    Billing,
}

text_enum!(AddressKind, "address kind", {
    Shipping => "shipping",
    Billing => "billing",
});

/// Backoffice role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full read/write access to the catalog, customers and orders.
    #[default]
    Admin,
    /// Read-only access.
    Viewer,
}

text_enum!(AdminRole, "admin role", {
    Admin => "admin",
    Viewer => "viewer",
});

impl AdminRole {
    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Admin)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_text() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Paid,
            OrderStatus::PaymentFailed,
            OrderStatus::Cancelled,
            OrderStatus::Shipped,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serde_matches_text() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
        let kind: AddressKind = serde_json::from_str("\"billing\"").unwrap();
        assert_eq!(kind, AddressKind::Billing);
    }

    #[test]
    fn test_order_transitions() {
        use OrderStatus::*;
        assert!(PendingPayment.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(PendingPayment));
    }

    #[test]
    fn test_manual_transitions() {
        use OrderStatus::*;
        assert!(PendingPayment.is_manual_transition(Cancelled));
        assert!(PaymentFailed.is_manual_transition(Cancelled));
        assert!(Paid.is_manual_transition(Shipped));
        assert!(Paid.is_manual_transition(Cancelled));
        assert!(!PendingPayment.is_manual_transition(Paid));
        assert!(!PendingPayment.is_manual_transition(Shipped));
        assert!(!PaymentFailed.is_manual_transition(Paid));
        assert!(!Shipped.is_manual_transition(Cancelled));
    }

    #[test]
    fn test_payment_outcomes() {
        assert!(!PaymentStatus::Pending.is_final());
        assert!(PaymentStatus::Failed.is_final());
        assert_eq!(
            PaymentStatus::Succeeded.order_status(),
            Some(OrderStatus::Paid)
        );
        assert_eq!(PaymentStatus::Pending.order_status(), None);
    }

    #[test]
    fn test_roles() {
        assert!(AdminRole::Admin.can_write());
        assert!(!AdminRole::Viewer.can_write());
        assert_eq!("viewer".parse::<AdminRole>().unwrap(), AdminRole::Viewer);
    }
}
