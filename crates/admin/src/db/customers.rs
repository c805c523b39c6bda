//! Customer CRUD and address book reads.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use nature_de_pierre_core::customer::{Address, Company, Customer, NewCustomer};
use nature_de_pierre_core::pagination::PageQuery;
use nature_de_pierre_core::validation::contains_pattern;
use nature_de_pierre_core::{AddressId, AddressKind, CustomerId, Email};

use super::RepositoryError;

const COLUMNS: &str = "id, email, first_name, last_name, phone, company_name, \
     company_siret, company_vat_number, created_at, updated_at";

const EMAIL_TAKEN: &str = "email already used by another customer";

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

/// Repository for backoffice customer management.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List customers, newest first, optionally matching `search` against
    /// email, names and company name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageQuery,
    ) -> Result<(Vec<Customer>, i64), RepositoryError> {
        const MATCH: &str = "($1::TEXT IS NULL OR email ILIKE $1 OR first_name ILIKE $1 \
             OR last_name ILIKE $1 OR company_name ILIKE $1)";

        let pattern = contains_pattern(search);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM crm.customer WHERE {MATCH}"
        ))
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            r"
            SELECT {COLUMNS} FROM crm.customer
            WHERE {MATCH}
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows.into_iter().map(Customer::from).collect(), total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM crm.customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Customer::from))
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already used.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError> {
        let company = customer.company.as_ref();
        let row: CustomerRow = sqlx::query_as(&format!(
            r"
            INSERT INTO crm.customer
                (email, first_name, last_name, phone, company_name, company_siret, company_vat_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "
        ))
        .bind(&customer.email)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(customer.phone.as_deref())
        .bind(company.map(|c| c.name.as_str()))
        .bind(company.and_then(|c| c.siret.as_deref()))
        .bind(company.and_then(|c| c.vat_number.as_deref()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, EMAIL_TAKEN))?;
        Ok(row.into())
    }

    /// Replace a customer's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    /// Returns `RepositoryError::Conflict` if the new email is already used.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: CustomerId,
        customer: &NewCustomer,
    ) -> Result<Customer, RepositoryError> {
        let company = customer.company.as_ref();
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            r"
            UPDATE crm.customer
            SET email = $2, first_name = $3, last_name = $4, phone = $5,
                company_name = $6, company_siret = $7, company_vat_number = $8,
                updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(&customer.email)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(customer.phone.as_deref())
        .bind(company.map(|c| c.name.as_str()))
        .bind(company.and_then(|c| c.siret.as_deref()))
        .bind(company.and_then(|c| c.vat_number.as_deref()))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, EMAIL_TAKEN))?;
        row.map(Customer::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a customer and their address book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist.
    /// Returns `RepositoryError::InUse` if the customer has orders.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM crm.customer WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::on_delete(e, "customer has orders"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// A customer's saved addresses, defaults first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored kind is unknown.
    pub async fn addresses(&self, id: CustomerId) -> Result<Vec<Address>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(
            r"
            SELECT id, customer_id, kind, first_name, last_name, company, line1, line2,
                   postal_code, city, country, phone, is_default, created_at
            FROM crm.address
            WHERE customer_id = $1
            ORDER BY kind, is_default DESC, created_at DESC
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
