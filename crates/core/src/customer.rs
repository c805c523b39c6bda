//! Customers, their company details and address book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{ValidationErrors, non_blank};
use crate::{AddressId, AddressKind, CustomerId, Email};

const NAME_MAX: usize = 100;
const COMPANY_MAX: usize = 200;
const PHONE_MAX: usize = 32;
const LINE_MAX: usize = 200;
const POSTAL_CODE_MAX: usize = 16;
const CITY_MAX: usize = 100;
const VAT_NUMBER_MAX: usize = 32;
const SIRET_LEN: usize = 14;

/// Default country for addresses (ISO 3166-1 alpha-2).
pub const DEFAULT_COUNTRY: &str = "FR";

fn default_country() -> String {
    DEFAULT_COUNTRY.to_owned()
}

/// Business customer details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    /// French establishment number, 14 digits.
    pub siret: Option<String>,
    /// Intra-community VAT number.
    pub vat_number: Option<String>,
}

impl Company {
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, COMPANY_MAX);
        if let Some(siret) = non_blank(self.siret.as_deref()) {
            let digits: String = siret.chars().filter(|c| !c.is_whitespace()).collect();
            if digits.len() != SIRET_LEN || !digits.chars().all(|c| c.is_ascii_digit()) {
                errors.add("siret", "must be 14 digits");
            }
        }
        errors.optional_text("vatNumber", self.vat_number.as_deref(), VAT_NUMBER_MAX);
        errors.into_result()
    }

    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            siret: non_blank(self.siret.as_deref())
                .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect()),
            vat_number: non_blank(self.vat_number.as_deref()).map(|v| v.to_uppercase()),
        }
    }
}

/// A customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company: Option<Company>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Create/update payload for a customer.
///
/// `email` stays a raw string so that an invalid address is reported as a
/// field error next to the others rather than as a body rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub company: Option<Company>,
}

impl CustomerInput {
    /// # Errors
    ///
    /// Returns every invalid field, company fields prefixed with `company.`.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("firstName", &self.first_name, NAME_MAX);
        errors.require_text("lastName", &self.last_name, NAME_MAX);
        errors.require_email("email", &self.email);
        errors.optional_text("phone", self.phone.as_deref(), PHONE_MAX);
        if let Some(company) = &self.company
            && let Err(nested) = company.validate()
        {
            errors.nest("company", nested);
        }
        errors.into_result()
    }

    /// Validate and normalize into a [`NewCustomer`].
    ///
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn into_new(self) -> Result<NewCustomer, ValidationErrors> {
        self.validate()?;
        let email = Email::parse(&self.email).map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add("email", e.to_string());
            errors
        })?;
        Ok(NewCustomer {
            email,
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            phone: non_blank(self.phone.as_deref()),
            company: self.company.as_ref().map(Company::normalized),
        })
    }
}

/// A validated customer, ready to be inserted or applied as an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company: Option<Company>,
}

/// A saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub customer_id: CustomerId,
    pub kind: AddressKind,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Address payload, used by the address book and the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[serde(default)]
    pub kind: AddressKind,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub company: Option<String>,
    #[serde(default)]
    pub line1: String,
    pub line2: Option<String>,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl Default for AddressInput {
    fn default() -> Self {
        Self {
            kind: AddressKind::default(),
            first_name: String::new(),
            last_name: String::new(),
            company: None,
            line1: String::new(),
            line2: None,
            postal_code: String::new(),
            city: String::new(),
            country: default_country(),
            phone: None,
            is_default: false,
        }
    }
}

impl AddressInput {
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("firstName", &self.first_name, NAME_MAX);
        errors.require_text("lastName", &self.last_name, NAME_MAX);
        errors.optional_text("company", self.company.as_deref(), COMPANY_MAX);
        errors.require_text("line1", &self.line1, LINE_MAX);
        errors.optional_text("line2", self.line2.as_deref(), LINE_MAX);
        errors.require_text("postalCode", &self.postal_code, POSTAL_CODE_MAX);
        errors.require_text("city", &self.city, CITY_MAX);
        errors.optional_text("phone", self.phone.as_deref(), PHONE_MAX);
        let country = self.country.trim();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.add("country", "must be a two-letter country code");
        }
        errors.into_result()
    }

    /// Trimmed copy, country uppercased, blank optionals dropped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            kind: self.kind,
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            company: non_blank(self.company.as_deref()),
            line1: self.line1.trim().to_owned(),
            line2: non_blank(self.line2.as_deref()),
            postal_code: self.postal_code.trim().to_owned(),
            city: self.city.trim().to_owned(),
            country: self.country.trim().to_ascii_uppercase(),
            phone: non_blank(self.phone.as_deref()),
            is_default: self.is_default,
        }
    }

    /// Copy of this address with another kind.
    #[must_use]
    pub fn with_kind(&self, kind: AddressKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Snapshot stored on an order.
    #[must_use]
    pub fn snapshot(&self) -> AddressSnapshot {
        let a = self.normalized();
        AddressSnapshot {
            first_name: a.first_name,
            last_name: a.last_name,
            company: a.company,
            line1: a.line1,
            line2: a.line2,
            postal_code: a.postal_code,
            city: a.city,
            country: a.country,
            phone: a.phone,
        }
    }
}

/// An address frozen onto an order.
///
/// Later edits to the customer's address book never change past orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
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
            country: "fr".into(),
            ..AddressInput::default()
        }
    }

    #[test]
    fn test_customer_requires_names_and_email() {
        let errors = CustomerInput::default().validate().unwrap_err();
        assert!(errors.has("firstName"));
        assert!(errors.has("lastName"));
        assert!(errors.has("email"));
    }

    #[test]
    fn test_customer_into_new_normalizes() {
        let input = CustomerInput {
            email: " Marie@Example.FR ".into(),
            first_name: " Marie ".into(),
            last_name: "Dupont".into(),
            phone: Some(String::new()),
            company: Some(Company {
                name: "Minéraux SARL".into(),
                siret: Some("123 456 789 00012".into()),
                vat_number: Some("fr12345678901".into()),
            }),
        };
        let new = input.into_new().unwrap();
        assert_eq!(new.email.as_str(), "marie@example.fr");
        assert_eq!(new.first_name, "Marie");
        assert_eq!(new.phone, None);
        let company = new.company.unwrap();
        assert_eq!(company.siret.as_deref(), Some("12345678900012"));
        assert_eq!(company.vat_number.as_deref(), Some("FR12345678901"));
    }

    #[test]
    fn test_company_errors_are_nested() {
        let input = CustomerInput {
            email: "a@b.fr".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            phone: None,
            company: Some(Company {
                name: String::new(),
                siret: Some("123".into()),
                vat_number: None,
            }),
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.has("company.name"));
        assert!(errors.has("company.siret"));
    }

    #[test]
    fn test_address_validation() {
        assert!(address().validate().is_ok());

        let mut bad = address();
        bad.city = " ".into();
        bad.country = "FRA".into();
        let errors = bad.validate().unwrap_err();
        assert!(errors.has("city"));
        assert!(errors.has("country"));
    }

    #[test]
    fn test_address_defaults() {
        let input: AddressInput = serde_json::from_str(r#"{"line1":"x"}"#).unwrap();
        assert_eq!(input.country, "FR");
        assert_eq!(input.kind, AddressKind::Shipping);
        assert!(!input.is_default);
    }

    #[test]
    fn test_snapshot_normalizes_country() {
        let snapshot = address().snapshot();
        assert_eq!(snapshot.country, "FR");
        assert_eq!(snapshot.city, "Lyon");
    }
}
