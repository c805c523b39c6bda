//! Session carts.
//!
//! Each visitor's cart is a JSON document stored under `cart:{owner}`, where
//! `owner` is a random id kept in the visitor's session. Every mutation is an
//! optimistic read-modify-write:
//!
//! 1. load the raw document (or start from an empty cart),
//! 2. apply the change and recompute totals,
//! 3. write it back with compare-and-swap against the raw value read in 1.
//!
//! A lost race means another request changed the cart in between; the cycle
//! starts over from the fresh value, so concurrent increments are never lost.
//!
//! A checkout holds a claim under `checkout:{owner}` while it runs, so one
//! session never places two orders from the same cart. When the order is
//! placed, the cart is deleted only if it is still the document the order
//! was built from; otherwise the ordered quantities are taken out of the
//! newer cart.

pub mod memory;
pub mod redis;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use nature_de_pierre_core::ProductId;
use nature_de_pierre_core::cart::{Cart, CartError, ProductSnapshot};

pub use self::memory::MemoryCartStore;
pub use self::redis::RedisCartStore;
pub use self::store::{CartStore, CartStoreError};

/// Attempts before a contended mutation gives up.
pub const MAX_ATTEMPTS: usize = 8;

/// Lifetime of a checkout claim if its holder never releases it.
pub const CHECKOUT_CLAIM_TTL: Duration = Duration::from_secs(120);

/// Errors raised by [`CartService`].
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Store(#[from] CartStoreError),

    #[error("cart serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Cart(#[from] CartError),

    /// Every attempt lost the race against another writer.
    #[error("cart was modified concurrently, retries exhausted")]
    Conflict,

    /// Another checkout of the same cart is running.
    #[error("a checkout of this cart is already in progress")]
    CheckoutInProgress,
}

/// A cart together with the stored document it was decoded from.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub cart: Cart,
    raw: Option<String>,
}

/// Exclusive right to check out one cart, released with
/// [`CartService::end_checkout`].
#[derive(Debug)]
pub struct CheckoutClaim {
    key: String,
    token: String,
}

/// Cart operations on top of a [`CartStore`].
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    ttl: Duration,
}

impl CartService {
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CartStore> {
        &self.store
    }

    fn key(owner: &str) -> String {
        format!("cart:{owner}")
    }

    /// Parse a stored document, falling back to an empty cart if it is unreadable.
    fn decode(owner: &str, raw: Option<&str>) -> Cart {
        let Some(raw) = raw else {
            return Cart::empty(owner);
        };
        match serde_json::from_str::<Cart>(raw) {
            Ok(mut cart) => {
                cart.customer_id = owner.to_owned();
                cart.recompute();
                cart
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable cart document");
                Cart::empty(owner)
            }
        }
    }

    /// Read a cart. Never writes; a missing cart reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Store` if the store is unreachable.
    #[instrument(skip(self))]
    pub async fn get(&self, owner: &str) -> Result<Cart, CartServiceError> {
        let raw = self.store.load(&Self::key(owner)).await?;
        Ok(Self::decode(owner, raw.as_deref()))
    }

    /// Read a cart and keep the raw document for [`CartService::settle_checkout`].
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Store` if the store is unreachable.
    pub async fn snapshot(&self, owner: &str) -> Result<CartSnapshot, CartServiceError> {
        let raw = self.store.load(&Self::key(owner)).await?;
        let cart = Self::decode(owner, raw.as_deref());
        Ok(CartSnapshot { cart, raw })
    }

    /// Take the checkout claim for `owner`'s cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::CheckoutInProgress` while another checkout
    /// holds the claim.
    #[instrument(skip(self))]
    pub async fn begin_checkout(&self, owner: &str) -> Result<CheckoutClaim, CartServiceError> {
        let key = format!("checkout:{owner}");
        let token = Uuid::new_v4().to_string();
        if !self
            .store
            .compare_and_swap(&key, None, &token, CHECKOUT_CLAIM_TTL)
            .await?
        {
            return Err(CartServiceError::CheckoutInProgress);
        }
        Ok(CheckoutClaim { key, token })
    }

    /// Release a checkout claim. A claim that already expired is left alone.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Store` if the store is unreachable.
    pub async fn end_checkout(&self, claim: &CheckoutClaim) -> Result<(), CartServiceError> {
        if !self.store.delete_if(&claim.key, &claim.token).await? {
            warn!(key = %claim.key, "Checkout claim expired before release");
        }
        Ok(())
    }

    /// Take the ordered lines out of the cart once their order is placed.
    ///
    /// The cart is deleted when it is unchanged since `ordered` was read.
    /// Otherwise the ordered quantities are subtracted from the current cart,
    /// keeping anything added meanwhile. Returns the remaining cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Conflict` when retries are exhausted.
    #[instrument(skip(self, ordered))]
    pub async fn settle_checkout(
        &self,
        owner: &str,
        ordered: &CartSnapshot,
    ) -> Result<Cart, CartServiceError> {
        if let Some(raw) = ordered.raw.as_deref()
            && self.store.delete_if(&Self::key(owner), raw).await?
        {
            return Ok(Cart::empty(owner));
        }
        info!("Cart changed during checkout, removing ordered lines only");
        self.mutate(owner, |cart| {
            for line in &ordered.cart.items {
                if let Some(current) = cart.item(line.product_id) {
                    let left = current.quantity.saturating_sub(line.quantity);
                    cart.set_quantity(line.product_id, left)?;
                }
            }
            Ok(())
        })
        .await
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Cart` for an invalid quantity, and
    /// `CartServiceError::Conflict` when retries are exhausted.
    #[instrument(skip(self, snapshot), fields(product_id = %snapshot.product_id))]
    pub async fn add_item(
        &self,
        owner: &str,
        snapshot: ProductSnapshot,
        quantity: u32,
    ) -> Result<Cart, CartServiceError> {
        self.mutate(owner, |cart| cart.add_item(snapshot.clone(), quantity))
            .await
    }

    /// Overwrite a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Cart` when the product has no line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        owner: &str,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartServiceError> {
        self.mutate(owner, |cart| cart.set_quantity(product_id, quantity))
            .await
    }

    /// Remove a line. Removing an absent product returns the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Store` if the store is unreachable.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: &str,
        product_id: ProductId,
    ) -> Result<Cart, CartServiceError> {
        let cart = self.get(owner).await?;
        if cart.item(product_id).is_none() {
            return Ok(cart);
        }
        self.mutate(owner, |cart| {
            cart.remove_item(product_id);
            Ok(())
        })
        .await
    }

    /// Delete a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Store` if the store is unreachable.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: &str) -> Result<(), CartServiceError> {
        self.store.delete(&Self::key(owner)).await?;
        Ok(())
    }

    async fn mutate<F>(&self, owner: &str, mut apply: F) -> Result<Cart, CartServiceError>
    where
        F: FnMut(&mut Cart) -> Result<(), CartError> + Send,
    {
        let key = Self::key(owner);
        for attempt in 1..=MAX_ATTEMPTS {
            let raw = self.store.load(&key).await?;
            let mut cart = Self::decode(owner, raw.as_deref());
            apply(&mut cart)?;
            let encoded = serde_json::to_string(&cart)?;

            if self
                .store
                .compare_and_swap(&key, raw.as_deref(), &encoded, self.ttl)
                .await?
            {
                return Ok(cart);
            }
            debug!(attempt, "Cart write lost a race, retrying");
        }
        warn!(owner, "Cart write retries exhausted");
        Err(CartServiceError::Conflict)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use nature_de_pierre_core::VatRate;

    use super::*;

    const TTL: Duration = Duration::from_secs(3600);

    fn service() -> CartService {
        CartService::new(Arc::new(MemoryCartStore::new()), TTL)
    }

    fn quartz() -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new(1),
            name: "Quartz rose".into(),
            unit_price_ht: dec!(12.50),
            vat_rate: VatRate::STANDARD,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_get_missing_cart_is_empty_and_not_written() {
        let carts = service();
        let cart = carts.get("owner").await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(carts.store().load("cart:owner").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_merges_and_persists() {
        let carts = service();
        carts.add_item("owner", quartz(), 1).await.unwrap();
        let cart = carts.add_item("owner", quartz(), 2).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.totals.total_ttc, dec!(45.00));

        let reloaded = carts.get("owner").await.unwrap();
        assert_eq!(reloaded.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_update_unknown_line() {
        let carts = service();
        let err = carts
            .update_quantity("owner", ProductId::new(42), 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CartServiceError::Cart(CartError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_absent_item_is_noop() {
        let carts = service();
        let cart = carts.remove_item("owner", ProductId::new(1)).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_clear_deletes_key() {
        let carts = service();
        carts.add_item("owner", quartz(), 1).await.unwrap();
        carts.clear("owner").await.unwrap();
        assert!(carts.get("owner").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_replaced() {
        let store = Arc::new(MemoryCartStore::new());
        store
            .compare_and_swap("cart:owner", None, "{not json", TTL)
            .await
            .unwrap();
        let carts = CartService::new(store, TTL);
        let cart = carts.add_item("owner", quartz(), 1).await.unwrap();
        assert_eq!(cart.items.len(), 1);
    }

    /// Memory store that yields after every read, and can overwrite a key
    /// right before the next compare-and-swap lands.
    #[derive(Default)]
    struct Interleaving {
        inner: MemoryCartStore,
        intrusion: Mutex<Option<(String, String)>>,
    }

    impl Interleaving {
        fn intrude_before_next_write(&self, key: &str, value: String) {
            *self.intrusion.lock().unwrap() = Some((key.to_owned(), value));
        }
    }

    #[async_trait]
    impl CartStore for Interleaving {
        async fn load(&self, key: &str) -> Result<Option<String>, CartStoreError> {
            let value = self.inner.load(key).await?;
            tokio::task::yield_now().await;
            Ok(value)
        }

        async fn compare_and_swap(
            &self,
            key: &str,
            expected: Option<&str>,
            new: &str,
            ttl: Duration,
        ) -> Result<bool, CartStoreError> {
            let intrusion = self.intrusion.lock().unwrap().take();
            if let Some((target, value)) = intrusion {
                self.inner.delete(&target).await?;
                self.inner.compare_and_swap(&target, None, &value, ttl).await?;
            }
            self.inner.compare_and_swap(key, expected, new, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), CartStoreError> {
            self.inner.delete(key).await
        }

        async fn delete_if(&self, key: &str, expected: &str) -> Result<bool, CartStoreError> {
            self.inner.delete_if(key, expected).await
        }

        async fn ping(&self) -> Result<(), CartStoreError> {
            Ok(())
        }
    }

    fn amethyst() -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new(2),
            name: "Améthyste".into(),
            unit_price_ht: dec!(8.00),
            vat_rate: VatRate::STANDARD,
            image_url: None,
        }
    }

    /// Raw document of a cart holding one amethyst.
    async fn amethyst_document() -> String {
        let other = service();
        other.add_item("owner", amethyst(), 1).await.unwrap();
        other.store().load("cart:owner").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_lost_race_is_retried_from_fresh_value() {
        let store = Arc::new(Interleaving::default());
        store.intrude_before_next_write("cart:owner", amethyst_document().await);
        let carts = CartService::new(Arc::clone(&store) as Arc<dyn CartStore>, TTL);

        let cart = carts.add_item("owner", quartz(), 1).await.unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.item(ProductId::new(1)).unwrap().quantity, 1);
        assert_eq!(cart.item(ProductId::new(2)).unwrap().quantity, 1);
        let stored = carts.get("owner").await.unwrap();
        assert_eq!(stored.items.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_keep_every_increment() {
        let carts = CartService::new(Arc::new(Interleaving::default()), TTL);
        let mut handles = Vec::new();
        for _ in 0..6 {
            let carts = carts.clone();
            handles.push(tokio::spawn(async move {
                carts.add_item("owner", quartz(), 1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let cart = carts.get("owner").await.unwrap();
        assert_eq!(cart.items[0].quantity, 6);
    }

    #[tokio::test]
    async fn test_checkout_claim_is_exclusive_until_released() {
        let carts = service();
        let claim = carts.begin_checkout("owner").await.unwrap();
        assert!(matches!(
            carts.begin_checkout("owner").await.unwrap_err(),
            CartServiceError::CheckoutInProgress
        ));
        assert!(carts.begin_checkout("someone-else").await.is_ok());

        carts.end_checkout(&claim).await.unwrap();
        assert!(carts.begin_checkout("owner").await.is_ok());
    }

    #[tokio::test]
    async fn test_settle_deletes_unchanged_cart() {
        let carts = service();
        carts.add_item("owner", quartz(), 2).await.unwrap();
        let ordered = carts.snapshot("owner").await.unwrap();

        let left = carts.settle_checkout("owner", &ordered).await.unwrap();

        assert!(left.is_empty());
        assert_eq!(carts.store().load("cart:owner").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_settle_keeps_what_was_added_during_checkout() {
        let carts = service();
        carts.add_item("owner", quartz(), 2).await.unwrap();
        let ordered = carts.snapshot("owner").await.unwrap();
        carts.add_item("owner", quartz(), 1).await.unwrap();
        carts.add_item("owner", amethyst(), 1).await.unwrap();

        let left = carts.settle_checkout("owner", &ordered).await.unwrap();

        assert_eq!(left.item(ProductId::new(1)).unwrap().quantity, 1);
        assert_eq!(left.item(ProductId::new(2)).unwrap().quantity, 1);
        assert_eq!(carts.get("owner").await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn test_settle_drops_lines_fully_ordered() {
        let carts = service();
        carts.add_item("owner", quartz(), 2).await.unwrap();
        let ordered = carts.snapshot("owner").await.unwrap();
        carts.add_item("owner", amethyst(), 3).await.unwrap();

        let left = carts.settle_checkout("owner", &ordered).await.unwrap();

        assert!(left.item(ProductId::new(1)).is_none());
        assert_eq!(left.item(ProductId::new(2)).unwrap().quantity, 3);
    }

    /// Store whose CAS always loses.
    struct AlwaysContended;

    #[async_trait]
    impl CartStore for AlwaysContended {
        async fn load(&self, _key: &str) -> Result<Option<String>, CartStoreError> {
            Ok(None)
        }

        async fn compare_and_swap(
            &self,
            _key: &str,
            _expected: Option<&str>,
            _new: &str,
            _ttl: Duration,
        ) -> Result<bool, CartStoreError> {
            Ok(false)
        }

        async fn delete(&self, _key: &str) -> Result<(), CartStoreError> {
            Ok(())
        }

        async fn delete_if(&self, _key: &str, _expected: &str) -> Result<bool, CartStoreError> {
            Ok(false)
        }

        async fn ping(&self) -> Result<(), CartStoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_conflict() {
        let carts = CartService::new(Arc::new(AlwaysContended), TTL);
        let err = carts.add_item("owner", quartz(), 1).await.unwrap_err();
        assert!(matches!(err, CartServiceError::Conflict));
    }
}
