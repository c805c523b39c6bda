//! Customer and address book persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use nature_de_pierre_core::customer::{Address, AddressInput, Company, Customer, NewCustomer};
use nature_de_pierre_core::{AddressId, AddressKind, CustomerId, Email};

use super::RepositoryError;

const CUSTOMER_COLUMNS: &str = "id, email, first_name, last_name, phone, company_name, \
     company_siret, company_vat_number, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    email: Email,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    company_name: Option<String>,
    company_siret: Option<String>,
    company_vat_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        let company = r.company_name.map(|name| Company {
            name,
            siret: r.company_siret,
            vat_number: r.company_vat_number,
        });
        Self {
            id: r.id,
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
            company,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Repository for customer records.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM crm.customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Customer::from))
    }

    /// Get a customer by (normalized) email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM crm.customer WHERE lower(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Customer::from))
    }

    /// Return the customer with this email, creating it when absent.
    ///
    /// The boolean is `true` when a new row was inserted. An existing
    /// customer is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_or_create(
        &self,
        customer: &NewCustomer,
    ) -> Result<(Customer, bool), RepositoryError> {
        let company = customer.company.as_ref();
        let inserted: Option<CustomerRow> = sqlx::query_as(&format!(
            r"
            INSERT INTO crm.customer
                (email, first_name, last_name, phone, company_name, company_siret, company_vat_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ((lower(email))) DO NOTHING
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(customer.email.as_str())
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(customer.phone.as_deref())
        .bind(company.map(|c| c.name.as_str()))
        .bind(company.and_then(|c| c.siret.as_deref()))
        .bind(company.and_then(|c| c.vat_number.as_deref()))
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let existing = self
            .get_by_email(&customer.email)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok((existing, false))
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    customer_id: CustomerId,
    kind: String,
    first_name: String,
    last_name: String,
    company: Option<String>,
    line1: String,
    line2: Option<String>,
    postal_code: String,
    city: String,
    country: String,
    phone: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(r: AddressRow) -> Result<Self, Self::Error> {
        let kind: AddressKind = r
            .kind
            .parse()
            .map_err(|e| RepositoryError::corrupt("address kind", e))?;
        Ok(Self {
            id: r.id,
            customer_id: r.customer_id,
            kind,
            first_name: r.first_name,
            last_name: r.last_name,
            company: r.company,
            line1: r.line1,
            line2: r.line2,
            postal_code: r.postal_code,
            city: r.city,
            country: r.country.trim().to_owned(),
            phone: r.phone,
            is_default: r.is_default,
            created_at: r.created_at,
        })
    }
}

/// Repository for the customer address book.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Save an address for a customer.
    ///
    /// A default address replaces any previous default of the same kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        customer_id: CustomerId,
        address: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let a = address.normalized();
        let mut tx = self.pool.begin().await?;

        if a.is_default {
            sqlx::query(
                "UPDATE crm.address SET is_default = FALSE WHERE customer_id = $1 AND kind = $2",
            )
            .bind(customer_id)
            .bind(a.kind.as_str())
            .execute(&mut *tx)
            .await?;
        }

        let row: AddressRow = sqlx::query_as(
            r"
            INSERT INTO crm.address
                (customer_id, kind, first_name, last_name, company, line1, line2,
                 postal_code, city, country, phone, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, customer_id, kind, first_name, last_name, company, line1, line2,
                      postal_code, city, country, phone, is_default, created_at
            ",
        )
        .bind(customer_id)
        .bind(a.kind.as_str())
        .bind(&a.first_name)
        .bind(&a.last_name)
        .bind(a.company.as_deref())
        .bind(&a.line1)
        .bind(a.line2.as_deref())
        .bind(&a.postal_code)
        .bind(&a.city)
        .bind(&a.country)
        .bind(a.phone.as_deref())
        .bind(a.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        tx.commit().await?;
        row.try_into()
    }
}
