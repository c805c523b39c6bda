//! Catalog records: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{ValidationErrors, contains_pattern, non_blank};
use crate::{CategoryId, ProductId, VatRate};

const NAME_MAX: usize = 120;
const PRODUCT_NAME_MAX: usize = 200;
const SKU_MAX: usize = 64;
const DESCRIPTION_MAX: usize = 5000;
const URL_MAX: usize = 2048;

// =============================================================================
// Categories
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category as shown on the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPublic {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Number of active products in the category.
    pub product_count: i64,
}

/// Create/update payload for a category.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl CategoryInput {
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, NAME_MAX);
        errors.optional_text("description", self.description.as_deref(), DESCRIPTION_MAX);
        errors.optional_text("imageUrl", self.image_url.as_deref(), URL_MAX);
        errors.into_result()
    }

    /// Trimmed copy with blank optionals dropped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            description: non_blank(self.description.as_deref()),
            image_url: non_blank(self.image_url.as_deref()),
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product as managed in the backoffice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sku: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_ht: Decimal,
    pub vat_rate: VatRate,
    pub stock_quantity: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Storefront view of this product.
    #[must_use]
    pub fn to_public(&self) -> ProductPublic {
        ProductPublic {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            category_id: self.category_id,
            price_ht: self.price_ht,
            vat_rate: self.vat_rate,
            price_ttc: self.vat_rate.ttc(self.price_ht),
            in_stock: self.stock_quantity > 0,
            image_url: self.image_url.clone(),
        }
    }
}

/// A product as shown on the storefront (active products only).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductPublic {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_ht: Decimal,
    pub vat_rate: VatRate,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_ttc: Decimal,
    pub in_stock: bool,
    pub image_url: Option<String>,
}

const fn default_true() -> bool {
    true
}

/// Create/update payload for a product.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub sku: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_ht: Decimal,
    #[serde(default)]
    pub vat_rate: VatRate,
    #[serde(default)]
    pub stock_quantity: i32,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl ProductInput {
    /// # Errors
    ///
    /// Returns every invalid field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, PRODUCT_NAME_MAX);
        errors.optional_text("sku", self.sku.as_deref(), SKU_MAX);
        errors.optional_text("description", self.description.as_deref(), DESCRIPTION_MAX);
        errors.optional_text("imageUrl", self.image_url.as_deref(), URL_MAX);
        if self.price_ht.is_sign_negative() && !self.price_ht.is_zero() {
            errors.add("priceHt", "must be zero or positive");
        }
        if self.price_ht.scale() > 2 && self.price_ht.normalize().scale() > 2 {
            errors.add("priceHt", "must have at most 2 decimals");
        }
        if self.stock_quantity < 0 {
            errors.add("stockQuantity", "must be zero or positive");
        }
        errors.into_result()
    }

    /// Trimmed copy with blank optionals dropped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            sku: non_blank(self.sku.as_deref()),
            name: self.name.trim().to_owned(),
            description: non_blank(self.description.as_deref()),
            image_url: non_blank(self.image_url.as_deref()),
            ..self.clone()
        }
    }
}

/// Body of `PATCH /products/{id}/active`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveToggle {
    pub is_active: bool,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// SQL `ORDER BY` clause for `catalog.product` aliased as `p`.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price_ht ASC, p.id ASC",
            Self::PriceDesc => "p.price_ht DESC, p.id DESC",
            Self::Name => "p.name ASC, p.id ASC",
        }
    }
}

/// Product listing filters (`GET /products?...`).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    /// Minimum HT price, inclusive.
    pub min_price: Option<Decimal>,
    /// Maximum HT price, inclusive.
    pub max_price: Option<Decimal>,
    /// Backoffice only; the storefront always forces active products.
    pub is_active: Option<bool>,
    #[serde(default)]
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Search term with SQL `LIKE` wildcards escaped, wrapped in `%`.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        contains_pattern(self.search.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn product_input() -> ProductInput {
        ProductInput {
            sku: Some(" AMT-01 ".into()),
            name: " Améthyste brute ".into(),
            description: Some("  ".into()),
            category_id: Some(CategoryId::new(1)),
            price_ht: dec!(12.50),
            vat_rate: VatRate::STANDARD,
            stock_quantity: 4,
            image_url: None,
            is_active: true,
        }
    }

    #[test]
    fn test_product_input_valid() {
        assert!(product_input().validate().is_ok());
    }

    #[test]
    fn test_product_input_rejects_negative_values() {
        let mut input = product_input();
        input.price_ht = dec!(-1);
        input.stock_quantity = -2;
        input.name = String::new();
        let errors = input.validate().unwrap_err();
        assert!(errors.has("priceHt"));
        assert!(errors.has("stockQuantity"));
        assert!(errors.has("name"));
    }

    #[test]
    fn test_product_input_rejects_sub_cent_prices() {
        let mut input = product_input();
        input.price_ht = dec!(1.005);
        assert!(input.validate().unwrap_err().has("priceHt"));
        input.price_ht = dec!(1.500);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_product_input_defaults() {
        let input: ProductInput =
            serde_json::from_str(r#"{"name":"Quartz rose","priceHt":9.9}"#).unwrap();
        assert!(input.is_active);
        assert_eq!(input.vat_rate, VatRate::STANDARD);
        assert_eq!(input.stock_quantity, 0);
        assert_eq!(input.price_ht, dec!(9.9));
    }

    #[test]
    fn test_normalized_trims() {
        let input = product_input().normalized();
        assert_eq!(input.name, "Améthyste brute");
        assert_eq!(input.sku.as_deref(), Some("AMT-01"));
        assert_eq!(input.description, None);
    }

    #[test]
    fn test_public_view_computes_ttc() {
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(1),
            sku: None,
            name: "Labradorite".into(),
            description: None,
            category_id: None,
            price_ht: dec!(25),
            vat_rate: VatRate::STANDARD,
            stock_quantity: 0,
            image_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let public = product.to_public();
        assert_eq!(public.price_ttc, dec!(30.00));
        assert!(!public.in_stock);

        let json = serde_json::to_value(&public).unwrap();
        assert_eq!(json["priceTtc"], serde_json::json!(30.0));
    }

    #[test]
    fn test_category_input_requires_name() {
        let input = CategoryInput::default();
        assert!(input.validate().unwrap_err().has("name"));
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let filter = ProductFilter {
            search: Some(" 100%_pur ".into()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.search_pattern().unwrap(), "%100\\%\\_pur%");
        assert_eq!(ProductFilter::default().search_pattern(), None);
    }
}
