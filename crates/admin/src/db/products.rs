//! Product CRUD, including inactive products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use nature_de_pierre_core::catalog::{Product, ProductFilter, ProductInput};
use nature_de_pierre_core::pagination::PageQuery;
use nature_de_pierre_core::{CategoryId, ProductId, VatRate};

use super::RepositoryError;

const COLUMNS: &str = "p.id, p.sku, p.name, p.description, p.category_id, p.price_ht, \
     p.vat_rate, p.stock_quantity, p.image_url, p.is_active, p.created_at, p.updated_at";

const RETURNING: &str = "RETURNING id, sku, name, description, category_id, price_ht, vat_rate, \
     stock_quantity, image_url, is_active, created_at, updated_at";

const SKU_TAKEN: &str = "sku already used by another product";
const UNKNOWN_CATEGORY: &str = "category does not exist";

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

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(active) = filter.is_active {
        qb.push(" AND p.is_active = ").push_bind(active);
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(pattern) = filter.search_pattern() {
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.sku ILIKE ")
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

/// Repository for backoffice product management.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, with the total match count.
    ///
    /// Unlike the storefront, inactive products are included unless
    /// `filter.is_active` says otherwise.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageQuery,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM catalog.product p WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM catalog.product p WHERE TRUE"
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

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM catalog.product p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU is already used.
    /// Returns `RepositoryError::InvalidReference` if the category does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO catalog.product
                (sku, name, description, category_id, price_ht, vat_rate, stock_quantity,
                 image_url, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            {RETURNING}
            "
        ))
        .bind(input.sku.as_deref())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.price_ht)
        .bind(input.vat_rate)
        .bind(input.stock_quantity)
        .bind(input.image_url.as_deref())
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, SKU_TAKEN, UNKNOWN_CATEGORY))?;
        Ok(row.into())
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the SKU is already used.
    /// Returns `RepositoryError::InvalidReference` if the category does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE catalog.product
            SET sku = $2, name = $3, description = $4, category_id = $5, price_ht = $6,
                vat_rate = $7, stock_quantity = $8, image_url = $9, is_active = $10,
                updated_at = now()
            WHERE id = $1
            {RETURNING}
            "
        ))
        .bind(id)
        .bind(input.sku.as_deref())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.price_ht)
        .bind(input.vat_rate)
        .bind(input.stock_quantity)
        .bind(input.image_url.as_deref())
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, SKU_TAKEN, UNKNOWN_CATEGORY))?;
        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Show or hide a product on the storefront.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_active(&self, id: ProductId, active: bool) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE catalog.product SET is_active = $2, updated_at = now() WHERE id = $1 {RETURNING}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;
        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Point a product at a new image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_image_url(
        &self,
        id: ProductId,
        image_url: &str,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE catalog.product SET image_url = $2, updated_at = now() WHERE id = $1 {RETURNING}"
        ))
        .bind(id)
        .bind(image_url)
        .fetch_optional(self.pool)
        .await?;
        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::InUse` if order lines reference it; such
    /// products can only be deactivated.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::on_delete(e, "product appears in orders"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
