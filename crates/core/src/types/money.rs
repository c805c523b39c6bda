//! Money and VAT arithmetic.
//!
//! Prices are stored before tax (HT, *hors taxe*) together with a VAT rate in
//! percent. Amounts including tax (TTC, *toutes taxes comprises*) are always
//! derived, never stored on products.
//!
//! All amounts use [`Decimal`] and are rounded with [`round_money`] to two
//! decimals, half away from zero.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Round a monetary amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// ISO 4217 currency code. The shop only sells in euros today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    EUR,
}

impl Currency {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EUR => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EUR" => Ok(Self::EUR),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// Errors building a [`VatRate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VatRateError {
    #[error("VAT rate must be between 0 and 100 (got {0})")]
    OutOfRange(Decimal),
}

/// A VAT rate expressed in percent (e.g. `20` for 20%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VatRate(Decimal);

impl VatRate {
    /// French standard rate.
    pub const STANDARD: Self = Self(Decimal::from_parts(20, 0, 0, false, 0));

    /// Build a rate, rejecting values outside `0..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`VatRateError::OutOfRange`] for negative rates or rates above 100.
    pub fn new(percent: Decimal) -> Result<Self, VatRateError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(VatRateError::OutOfRange(percent));
        }
        Ok(Self(percent.normalize()))
    }

    #[must_use]
    pub const fn percent(self) -> Decimal {
        self.0
    }

    /// VAT owed on an HT amount, unrounded.
    #[must_use]
    pub fn vat_on(self, amount_ht: Decimal) -> Decimal {
        amount_ht * self.0 / Decimal::ONE_HUNDRED
    }

    /// TTC amount for an HT amount, rounded to cents.
    #[must_use]
    pub fn ttc(self, amount_ht: Decimal) -> Decimal {
        round_money(amount_ht + self.vat_on(amount_ht))
    }
}

impl Default for VatRate {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for VatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Serialize for VatRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for VatRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = rust_decimal::serde::float::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for VatRate {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for VatRate {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for VatRate {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn test_standard_rate() {
        assert_eq!(VatRate::STANDARD.percent(), dec!(20));
        assert_eq!(VatRate::default(), VatRate::STANDARD);
    }

    #[test]
    fn test_rate_bounds() {
        assert!(VatRate::new(dec!(0)).is_ok());
        assert!(VatRate::new(dec!(100)).is_ok());
        assert!(VatRate::new(dec!(-0.5)).is_err());
        assert!(VatRate::new(dec!(100.01)).is_err());
    }

    #[test]
    fn test_ttc() {
        let rate = VatRate::new(dec!(5.5)).unwrap();
        assert_eq!(rate.ttc(dec!(10)), dec!(10.55));
        assert_eq!(VatRate::STANDARD.ttc(dec!(19.99)), dec!(23.99));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&VatRate::new(dec!(5.5)).unwrap()).unwrap();
        assert_eq!(json, "5.5");
        assert!(serde_json::from_str::<VatRate>("150").is_err());
    }
}
