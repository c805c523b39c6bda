//! Shopping cart model and totals.
//!
//! A cart is a list of lines keyed by product id. Lines carry a snapshot of
//! the catalog data (name, HT unit price, VAT rate) taken when the product was
//! first added, so a cart renders without touching the catalog.
//!
//! Totals are derived and recomputed after every mutation:
//!
//! ```text
//! lineHt   = unitPriceHt * quantity
//! lineVat  = lineHt * vatRate / 100
//! totalHt  = Σ lineHt
//! totalVat = Σ lineVat
//! totalTtc = totalHt + totalVat
//! ```
//!
//! Each published figure is rounded to cents with [`round_money`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, ProductPublic};
use crate::{ProductId, VatRate, round_money};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Errors raised by cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("quantity must be at most {max}")]
    QuantityTooLarge { max: u32 },

    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),
}

/// Catalog data copied into a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price_ht: Decimal,
    pub vat_rate: VatRate,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price_ht: product.price_ht,
            vat_rate: product.vat_rate,
            image_url: product.image_url.clone(),
        }
    }
}

impl From<&ProductPublic> for ProductSnapshot {
    fn from(product: &ProductPublic) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price_ht: product.price_ht,
            vat_rate: product.vat_rate,
            image_url: product.image_url.clone(),
        }
    }
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price_ht: Decimal,
    pub vat_rate: VatRate,
    pub quantity: u32,
    pub image_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total_ht: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total_ttc: Decimal,
}

impl CartItem {
    fn new(snapshot: ProductSnapshot, quantity: u32) -> Self {
        let mut item = Self {
            product_id: snapshot.product_id,
            name: snapshot.name,
            unit_price_ht: snapshot.unit_price_ht,
            vat_rate: snapshot.vat_rate,
            quantity,
            image_url: snapshot.image_url,
            line_total_ht: Decimal::ZERO,
            line_total_ttc: Decimal::ZERO,
        };
        item.refresh();
        item
    }

    /// Unrounded HT amount of the line.
    #[must_use]
    pub fn raw_ht(&self) -> Decimal {
        self.unit_price_ht * Decimal::from(self.quantity)
    }

    /// Unrounded VAT amount of the line.
    #[must_use]
    pub fn raw_vat(&self) -> Decimal {
        self.vat_rate.vat_on(self.raw_ht())
    }

    fn refresh(&mut self) {
        let ht = self.raw_ht();
        self.line_total_ht = round_money(ht);
        self.line_total_ttc = round_money(ht + self.vat_rate.vat_on(ht));
    }
}

/// Aggregated cart amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_ht: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_vat: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_ttc: Decimal,
    pub item_count: u32,
}

impl CartTotals {
    /// Compute totals over a set of lines.
    #[must_use]
    pub fn of(items: &[CartItem]) -> Self {
        let ht: Decimal = items.iter().map(CartItem::raw_ht).sum();
        let vat: Decimal = items.iter().map(CartItem::raw_vat).sum();
        let total_ht = round_money(ht);
        let total_vat = round_money(vat);
        Self {
            total_ht,
            total_vat,
            total_ttc: total_ht + total_vat,
            item_count: items.iter().map(|i| i.quantity).sum(),
        }
    }
}

/// A customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Owner key (session cart id).
    pub customer_id: String,
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub totals: CartTotals,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// An empty cart for `owner`.
    #[must_use]
    pub fn empty(owner: impl Into<String>) -> Self {
        Self {
            customer_id: owner.into(),
            items: Vec::new(),
            totals: CartTotals::default(),
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Rejects a zero quantity or a line that would exceed
    /// [`MAX_LINE_QUANTITY`].
    pub fn add_item(&mut self, snapshot: ProductSnapshot, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        match self
            .items
            .iter_mut()
            .find(|i| i.product_id == snapshot.product_id)
        {
            Some(line) => {
                let merged = line.quantity.saturating_add(quantity);
                if merged > MAX_LINE_QUANTITY {
                    return Err(CartError::QuantityTooLarge {
                        max: MAX_LINE_QUANTITY,
                    });
                }
                line.quantity = merged;
            }
            None => {
                if quantity > MAX_LINE_QUANTITY {
                    return Err(CartError::QuantityTooLarge {
                        max: MAX_LINE_QUANTITY,
                    });
                }
                self.items.push(CartItem::new(snapshot, quantity));
            }
        }
        self.touch();
        Ok(())
    }

    /// Overwrite the quantity of a line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// [`CartError::ItemNotFound`] when the product has no line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            });
        }
        let Some(index) = self.items.iter().position(|i| i.product_id == product_id) else {
            return Err(CartError::ItemNotFound(product_id));
        };
        if quantity == 0 {
            self.items.remove(index);
        } else {
            self.items[index].quantity = quantity;
        }
        self.touch();
        Ok(())
    }

    /// Drop a line. Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Recompute line and cart totals from quantities and unit prices.
    ///
    /// Stored blobs are never trusted for amounts; callers run this after
    /// deserializing.
    pub fn recompute(&mut self) {
        for item in &mut self.items {
            item.refresh();
        }
        self.totals = CartTotals::of(&self.items);
    }

    fn touch(&mut self) {
        self.recompute();
        self.updated_at = Utc::now();
    }
}
