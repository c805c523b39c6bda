//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Pierres roulées
//!     description: Pierres polies au tonneau
//!     products:
//!       - sku: AMT-ROUL-S
//!         name: Améthyste roulée
//!         priceHt: 4.90
//!         vatRate: 20
//!         stockQuantity: 120
//! products:            # uncategorized
//!   - name: Bol chantant
//!     priceHt: 39.00
//! ```
//!
//! Seeding is additive: categories are matched by name (case-insensitively)
//! and reused, products whose SKU already exists are skipped.

use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use nature_de_pierre_admin::db::{CategoryRepository, ProductRepository, RepositoryError};
use nature_de_pierre_core::CategoryId;
use nature_de_pierre_core::catalog::{CategoryInput, ProductInput};

use super::{CliError, connect};

/// Top level of a catalog seed file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub products: Vec<ProductInput>,
}

/// A category and the products filed under it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySeed {
    #[serde(flatten)]
    pub category: CategoryInput,
    #[serde(default)]
    pub products: Vec<ProductInput>,
}

/// What a seed run changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub products_created: usize,
    pub products_skipped: usize,
}

impl CatalogSeed {
    /// Parse and validate a seed document.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Seed` for malformed YAML or an invalid entry.
    pub fn parse(yaml: &str) -> Result<Self, CliError> {
        let seed: Self = serde_yaml::from_str(yaml).map_err(|e| CliError::Seed(e.to_string()))?;
        seed.validate()?;
        Ok(seed)
    }

    fn validate(&self) -> Result<(), CliError> {
        for entry in &self.categories {
            entry
                .category
                .validate()
                .map_err(|e| CliError::Seed(format!("category {:?}: {e}", entry.category.name)))?;
        }
        let products = self
            .categories
            .iter()
            .flat_map(|c| &c.products)
            .chain(&self.products);
        for product in products {
            product
                .validate()
                .map_err(|e| CliError::Seed(format!("product {:?}: {e}", product.name)))?;
        }
        Ok(())
    }
}

/// Seed the catalog from the YAML file at `file_path`.
///
/// # Errors
///
/// Returns `CliError` if the file cannot be read or parsed, or a database
/// operation fails.
pub async fn catalog(file_path: &str) -> Result<SeedReport, CliError> {
    let yaml = std::fs::read_to_string(Path::new(file_path)).map_err(|source| CliError::Read {
        path: file_path.to_owned(),
        source,
    })?;
    let seed = CatalogSeed::parse(&yaml)?;
    info!(
        categories = seed.categories.len(),
        "Loaded seed file {}",
        file_path
    );

    let pool = connect("ADMIN_DATABASE_URL").await?;
    let report = apply(&pool, seed).await?;

    info!(
        categories_created = report.categories_created,
        products_created = report.products_created,
        products_skipped = report.products_skipped,
        "Catalog seeded"
    );
    Ok(report)
}

async fn apply(pool: &PgPool, seed: CatalogSeed) -> Result<SeedReport, CliError> {
    let categories = CategoryRepository::new(pool);
    let mut existing = categories.list().await?;
    let mut report = SeedReport::default();

    for entry in seed.categories {
        let input = entry.category.normalized();
        let found = existing
            .iter()
            .find(|c| c.name.to_lowercase() == input.name.to_lowercase())
            .map(|c| c.id);
        let category_id = if let Some(id) = found {
            id
        } else {
            let created = categories.create(&input).await?;
            info!(category_id = %created.id, name = %created.name, "Created category");
            report.categories_created += 1;
            let id = created.id;
            existing.push(created);
            id
        };

        for product in entry.products {
            insert_product(pool, product, Some(category_id), &mut report).await?;
        }
    }

    for product in seed.products {
        insert_product(pool, product, None, &mut report).await?;
    }
    Ok(report)
}

async fn insert_product(
    pool: &PgPool,
    product: ProductInput,
    category_id: Option<CategoryId>,
    report: &mut SeedReport,
) -> Result<(), CliError> {
    let input = ProductInput {
        category_id: category_id.or(product.category_id),
        ..product.normalized()
    };
    match ProductRepository::new(pool).create(&input).await {
        Ok(created) => {
            info!(product_id = %created.id, name = %created.name, "Created product");
            report.products_created += 1;
            Ok(())
        }
        Err(RepositoryError::Conflict(_)) => {
            info!(sku = ?input.sku, "SKU already exists, skipping");
            report.products_skipped += 1;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const SEED: &str = r"
categories:
  - name: Pierres roulées
    description: Pierres polies au tonneau
    products:
      - sku: AMT-ROUL-S
        name: Améthyste roulée
        priceHt: 4.90
        stockQuantity: 120
      - sku: QRZ-ROSE-S
        name: Quartz rose roulé
        priceHt: 3.5
        vatRate: 5.5
products:
  - name: Bol chantant
    priceHt: 39
";

    #[test]
    fn test_parse_seed() {
        let seed = CatalogSeed::parse(SEED).unwrap();
        assert_eq!(seed.categories.len(), 1);

        let category = &seed.categories[0];
        assert_eq!(category.category.name, "Pierres roulées");
        assert_eq!(category.products.len(), 2);
        assert_eq!(category.products[0].price_ht, dec!(4.90));
        assert_eq!(category.products[0].vat_rate.percent(), dec!(20));
        assert!(category.products[0].is_active);
        assert_eq!(category.products[1].vat_rate.percent(), dec!(5.5));

        assert_eq!(seed.products.len(), 1);
        assert_eq!(seed.products[0].stock_quantity, 0);
    }

    #[test]
    fn test_rejects_invalid_product() {
        let yaml = r"
products:
  - name: ''
    priceHt: -1
";
        let err = CatalogSeed::parse(yaml).unwrap_err();
        assert!(matches!(err, CliError::Seed(_)));
    }

    #[test]
    fn test_rejects_out_of_range_vat() {
        let yaml = r"
products:
  - name: Géode
    priceHt: 80
    vatRate: 120
";
        assert!(CatalogSeed::parse(yaml).is_err());
    }

    #[test]
    fn test_empty_document_is_valid() {
        let seed = CatalogSeed::parse("{}").unwrap();
        assert!(seed.categories.is_empty());
        assert!(seed.products.is_empty());
    }
}
