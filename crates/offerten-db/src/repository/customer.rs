//! # Customer Repository
//!
//! Customer records with their own `K-` number series. New customers are
//! created through [`crate::DocumentIssuer::create_customer`], which owns
//! the allocate-and-retry loop; this repository only reads and writes rows.

use chrono::{DateTime, Utc};
use offerten_core::types::{Customer, CustomerSnapshot};
use offerten_core::validation;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: String,
    customer_number: String,
    name: String,
    street: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            customer_number: row.customer_number,
            contact: CustomerSnapshot {
                name: row.name,
                street: row.street,
                postal_code: row.postal_code,
                city: row.city,
                email: row.email,
                phone: row.phone,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = r#"
    id, customer_number, name, street, postal_code, city, email, phone,
    created_at, updated_at
"#;

/// Repository for customer records.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Highest customer number issued so far, compared numerically.
    ///
    /// `K-100000` sorts after `K-99999` because longer numbers come first.
    pub async fn current_max_number(&self) -> DbResult<Option<String>> {
        let max: Option<String> = sqlx::query_scalar(
            r#"
            SELECT customer_number FROM customers
            ORDER BY length(customer_number) DESC, customer_number DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(max)
    }

    /// Inserts a customer with an already allocated number.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` on `customers.customer_number` when
    ///   the number was taken in the meantime
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(customer_number = %customer.customer_number, "Inserting customer");

        let contact = &customer.contact;
        sqlx::query(
            r#"
            INSERT INTO customers (
                id, customer_number, name, street, postal_code, city, email, phone,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.customer_number)
        .bind(&contact.name)
        .bind(&contact.street)
        .bind(&contact.postal_code)
        .bind(&contact.city)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, &customer.customer_number)
            }
            other => other,
        })?;

        Ok(())
    }

    /// Updates the contact details. Documents keep the snapshot they were
    /// issued with.
    pub async fn update_contact(&self, id: &str, contact: &CustomerSnapshot) -> DbResult<Customer> {
        validation::validate_customer_snapshot(contact)?;

        debug!(id = %id, "Updating customer contact");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2, street = ?3, postal_code = ?4, city = ?5,
                email = ?6, phone = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(contact.name.trim())
        .bind(&contact.street)
        .bind(&contact.postal_code)
        .bind(&contact.city)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("SELECT {} FROM customers WHERE id = ?1", COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Customer::from))
    }

    /// Gets a customer by number (`K-10001`).
    pub async fn get_by_number(&self, customer_number: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customers WHERE customer_number = ?1",
            COLUMNS
        ))
        .bind(customer_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Searches by name, email or number. Empty query lists everyone.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let query = query.trim();
        let pattern = format!("%{}%", query);

        debug!(query = %query, limit, "Searching customers");

        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM customers
            WHERE ?1 = '' OR name LIKE ?2 OR email LIKE ?2 OR customer_number LIKE ?2
            ORDER BY name
            LIMIT ?3
            "#,
            COLUMNS
        ))
        .bind(query)
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Counts customers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
