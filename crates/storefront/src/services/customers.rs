//! Customer directory used by the checkout and the customer endpoints.

use async_trait::async_trait;
use sqlx::PgPool;

use nature_de_pierre_core::CustomerId;
use nature_de_pierre_core::customer::{Address, AddressInput, Customer, NewCustomer};

use crate::db::{AddressRepository, CustomerRepository, RepositoryError};

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Existing customer with this email, or a new one. `true` when created.
    async fn find_or_create(
        &self,
        customer: &NewCustomer,
    ) -> Result<(Customer, bool), RepositoryError>;

    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    async fn save_address(
        &self,
        customer_id: CustomerId,
        address: &AddressInput,
    ) -> Result<Address, RepositoryError>;
}

/// `PostgreSQL` customer directory.
#[derive(Clone)]
pub struct PgCustomerDirectory {
    pool: PgPool,
}

impl PgCustomerDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerDirectory for PgCustomerDirectory {
    async fn find_or_create(
        &self,
        customer: &NewCustomer,
    ) -> Result<(Customer, bool), RepositoryError> {
        CustomerRepository::new(&self.pool)
            .find_or_create(customer)
            .await
    }

    async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        CustomerRepository::new(&self.pool).get(id).await
    }

    async fn save_address(
        &self,
        customer_id: CustomerId,
        address: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        AddressRepository::new(&self.pool)
            .create(customer_id, address)
            .await
    }
}
