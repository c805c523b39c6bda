//! Catalog reads for the storefront.
//!
//! Product and category lookups used while browsing and by the cart are
//! cached in memory for 5 minutes. Checkout re-prices against
//! [`Catalog::current_products`], which always hits the database.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use nature_de_pierre_core::ProductId;
use nature_de_pierre_core::catalog::{CategoryPublic, Product, ProductFilter, ProductPublic};
use nature_de_pierre_core::pagination::{Page, PageQuery};

use crate::db::{CategoryRepository, ProductRepository, RepositoryError};

/// Read access to the active catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Page through active products.
    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageQuery,
    ) -> Result<Page<ProductPublic>, RepositoryError>;

    /// An active product, `None` when missing or inactive.
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductPublic>, RepositoryError>;

    /// All categories with their active product counts.
    async fn list_categories(&self) -> Result<Vec<CategoryPublic>, RepositoryError>;

    /// Uncached current state of the given products. Missing and inactive
    /// products are left out.
    async fn current_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Categories,
}

#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<ProductPublic>),
    Categories(Vec<CategoryPublic>),
}

/// `PostgreSQL` catalog with a `moka` read cache.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
    cache: Cache<CacheKey, CacheValue>,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300))
            .build();
        Self { pool, cache }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    #[instrument(skip(self))]
    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageQuery,
    ) -> Result<Page<ProductPublic>, RepositoryError> {
        let (products, total) = ProductRepository::new(&self.pool)
            .list_active(filter, page)
            .await?;
        let items = products.iter().map(Product::to_public).collect();
        Ok(Page::new(items, total, page))
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductPublic>, RepositoryError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let Some(product) = ProductRepository::new(&self.pool).get_active(id).await? else {
            return Ok(None);
        };
        let public = product.to_public();
        self.cache
            .insert(key, CacheValue::Product(Box::new(public.clone())))
            .await;
        Ok(Some(public))
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<CategoryPublic>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = CategoryRepository::new(&self.pool).list_with_counts().await?;
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn current_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get_active_many(ids).await
    }
}
