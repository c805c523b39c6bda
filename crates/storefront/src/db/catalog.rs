//! Read-only catalog queries.
//!
//! The storefront only ever sees active products; inactive ones behave as if
//! they did not exist.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use nature_de_pierre_core::catalog::{CategoryPublic, Product, ProductFilter};
use nature_de_pierre_core::pagination::PageQuery;
use nature_de_pierre_core::{CategoryId, ProductId, VatRate};

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "p.id, p.sku, p.name, p.description, p.category_id, p.price_ht, \
     p.vat_rate, p.stock_quantity, p.image_url, p.is_active, p.created_at, p.updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    sku: Option<String>,
    name: String,
    description: Option<String>,
    category_id: Option<CategoryId>,
    price_ht: Decimal,
    vat_rate: VatRate,
    stock_quantity: i32,
    image_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            sku: r.sku,
            name: r.name,
            description: r.description,
            category_id: r.category_id,
            price_ht: r.price_ht,
            vat_rate: r.vat_rate,
            stock_quantity: r.stock_quantity,
            image_url: r.image_url,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Append the `WHERE` conditions of a [`ProductFilter`] (after an existing `WHERE`).
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" AND p.is_active");
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(pattern) = filter.search_pattern() {
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price_ht >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price_ht <= ").push_bind(max);
    }
}

/// Repository for storefront product reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products matching `filter`, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_active(
        &self,
        filter: &ProductFilter,
        page: PageQuery,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM catalog.product p WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE TRUE"
        ));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok((rows.into_iter().map(Product::from).collect(), total))
    }

    /// Get an active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.id = $1 AND p.is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    /// Get the active products among `ids`. Missing or inactive ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.id = ANY($1) AND p.is_active"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct CategoryCountRow {
    id: CategoryId,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    product_count: i64,
}

/// Repository for storefront category reads.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories with their number of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_counts(&self) -> Result<Vec<CategoryPublic>, RepositoryError> {
        let rows: Vec<CategoryCountRow> = sqlx::query_as(
            r"
            SELECT c.id, c.name, c.description, c.image_url,
                   COUNT(p.id) FILTER (WHERE p.is_active) AS product_count
            FROM catalog.category c
            LEFT JOIN catalog.product p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CategoryPublic {
                id: r.id,
                name: r.name,
                description: r.description,
                image_url: r.image_url,
                product_count: r.product_count,
            })
            .collect())
    }
}
