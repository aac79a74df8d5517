//! # Document Repository
//!
//! Stored quotes, receipts and invoices with their frozen lines.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Document Writes                                   │
//! │                                                                         │
//! │  insert()          one transaction: document row + all lines           │
//! │                    UNIQUE(document_number) rejects a lost race         │
//! │                                                                         │
//! │  update_pricing()  one transaction: totals + replace lines             │
//! │                    only while status is draft / sent                   │
//! │                                                                         │
//! │  update_status()   status, timestamps, acceptance                      │
//! │                    only if the status is still the one we read         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use offerten_core::money::Money;
use offerten_core::types::{
    Acceptance, CustomerSnapshot, Document, DocumentLine, DocumentStatus, DocumentType, LineKind,
    TaxRate,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    document_number: String,
    document_type: DocumentType,
    status: DocumentStatus,
    customer_id: Option<String>,
    customer_name: String,
    customer_street: Option<String>,
    customer_postal_code: Option<String>,
    customer_city: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    workers: i32,
    rooms: i32,
    trucks: i32,
    base_override_cents: Option<i64>,
    subtotal_cents: i64,
    tax_enabled: bool,
    tax_rate_bps: i64,
    tax_amount_cents: i64,
    total_cents: i64,
    notes: Option<String>,
    public_token: String,
    acceptance_signature: Option<String>,
    acceptance_location: Option<String>,
    acceptance_date: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    responded_at: Option<DateTime<Utc>>,
}

impl DocumentRow {
    fn into_document(self, lines: Vec<DocumentLine>) -> DbResult<Document> {
        let tax_rate_bps = u32::try_from(self.tax_rate_bps)
            .map_err(|_| DbError::corrupt("document", &self.id, "negative tax rate"))?;

        let acceptance = match (self.acceptance_location, self.acceptance_date) {
            (Some(location), Some(date)) => Some(Acceptance {
                signature: self.acceptance_signature,
                location,
                date,
            }),
            _ => None,
        };

        Ok(Document {
            id: self.id,
            document_number: self.document_number,
            document_type: self.document_type,
            status: self.status,
            customer_id: self.customer_id,
            customer: CustomerSnapshot {
                name: self.customer_name,
                street: self.customer_street,
                postal_code: self.customer_postal_code,
                city: self.customer_city,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            lines,
            workers: self.workers,
            rooms: self.rooms,
            trucks: self.trucks,
            base_override: self.base_override_cents.map(Money::from_cents),
            subtotal: Money::from_cents(self.subtotal_cents),
            tax_enabled: self.tax_enabled,
            tax_rate: TaxRate::from_bps(tax_rate_bps),
            tax_amount: Money::from_cents(self.tax_amount_cents),
            total: Money::from_cents(self.total_cents),
            notes: self.notes,
            public_token: self.public_token,
            acceptance,
            created_at: self.created_at,
            updated_at: self.updated_at,
            sent_at: self.sent_at,
            responded_at: self.responded_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    position: i32,
    kind: LineKind,
    reference: String,
    name: String,
    base_price_cents: i64,
    surcharge_cents: i64,
    price_cents: i64,
}

impl From<LineRow> for DocumentLine {
    fn from(row: LineRow) -> Self {
        DocumentLine {
            position: row.position,
            kind: row.kind,
            reference: row.reference,
            name: row.name,
            base_price: Money::from_cents(row.base_price_cents),
            surcharge: Money::from_cents(row.surcharge_cents),
            price: Money::from_cents(row.price_cents),
        }
    }
}

const COLUMNS: &str = r#"
    id, document_number, document_type, status,
    customer_id, customer_name, customer_street, customer_postal_code,
    customer_city, customer_email, customer_phone,
    workers, rooms, trucks,
    base_override_cents, subtotal_cents, tax_enabled, tax_rate_bps,
    tax_amount_cents, total_cents,
    notes, public_token,
    acceptance_signature, acceptance_location, acceptance_date,
    created_at, updated_at, sent_at, responded_at
"#;

// =============================================================================
// Filter
// =============================================================================

/// Criteria for [`DocumentRepository::list`]. Empty filter lists everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFilter {
    pub document_type: Option<DocumentType>,
    pub status: Option<DocumentStatus>,
    pub customer_id: Option<String>,
    pub limit: Option<u32>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for documents and their lines.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Highest number of `document_type` issued so far, compared
    /// numerically (longer numbers first, then lexically).
    pub async fn current_max_number(&self, document_type: DocumentType) -> DbResult<Option<String>> {
        let max: Option<String> = sqlx::query_scalar(
            r#"
            SELECT document_number FROM documents
            WHERE document_type = ?1
            ORDER BY length(document_number) DESC, document_number DESC
            LIMIT 1
            "#,
        )
        .bind(document_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(max)
    }

    /// Inserts a document and its lines in one transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` on `documents.document_number` when
    ///   another writer stored the same number first. Nothing is written.
    pub async fn insert(&self, document: &Document) -> DbResult<()> {
        debug!(
            id = %document.id,
            document_number = %document.document_number,
            "Inserting document"
        );

        let mut tx = self.pool.begin().await?;

        let customer = &document.customer;
        let acceptance = document.acceptance.as_ref();
        sqlx::query(&format!(
            r#"
            INSERT INTO documents ({}) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22,
                ?23, ?24, ?25,
                ?26, ?27, ?28, ?29
            )
            "#,
            COLUMNS
        ))
        .bind(&document.id)
        .bind(&document.document_number)
        .bind(document.document_type)
        .bind(document.status)
        .bind(&document.customer_id)
        .bind(&customer.name)
        .bind(&customer.street)
        .bind(&customer.postal_code)
        .bind(&customer.city)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(document.workers)
        .bind(document.rooms)
        .bind(document.trucks)
        .bind(document.base_override.map(|m| m.cents()))
        .bind(document.subtotal.cents())
        .bind(document.tax_enabled)
        .bind(document.tax_rate.bps() as i64)
        .bind(document.tax_amount.cents())
        .bind(document.total.cents())
        .bind(&document.notes)
        .bind(&document.public_token)
        .bind(acceptance.and_then(|a| a.signature.clone()))
        .bind(acceptance.map(|a| a.location.clone()))
        .bind(acceptance.map(|a| a.date.clone()))
        .bind(document.created_at)
        .bind(document.updated_at)
        .bind(document.sent_at)
        .bind(document.responded_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, &document.document_number)
            }
            other => other,
        })?;

        insert_lines(&mut tx, &document.id, &document.lines).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Writes re-priced customer data, counts, totals and lines.
    ///
    /// ## Returns
    /// * `Err(DbError::StaleWrite)` - the document left draft/sent meanwhile
    pub async fn update_pricing(&self, document: &Document) -> DbResult<()> {
        debug!(id = %document.id, "Updating document pricing");

        let mut tx = self.pool.begin().await?;

        let customer = &document.customer;
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                customer_id = ?2,
                customer_name = ?3,
                customer_street = ?4,
                customer_postal_code = ?5,
                customer_city = ?6,
                customer_email = ?7,
                customer_phone = ?8,
                workers = ?9,
                rooms = ?10,
                trucks = ?11,
                base_override_cents = ?12,
                subtotal_cents = ?13,
                tax_enabled = ?14,
                tax_rate_bps = ?15,
                tax_amount_cents = ?16,
                total_cents = ?17,
                notes = ?18,
                updated_at = ?19
            WHERE id = ?1 AND status IN ('draft', 'sent')
            "#,
        )
        .bind(&document.id)
        .bind(&document.customer_id)
        .bind(&customer.name)
        .bind(&customer.street)
        .bind(&customer.postal_code)
        .bind(&customer.city)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(document.workers)
        .bind(document.rooms)
        .bind(document.trucks)
        .bind(document.base_override.map(|m| m.cents()))
        .bind(document.subtotal.cents())
        .bind(document.tax_enabled)
        .bind(document.tax_rate.bps() as i64)
        .bind(document.tax_amount.cents())
        .bind(document.total.cents())
        .bind(&document.notes)
        .bind(document.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::StaleWrite {
                entity: "Document".to_string(),
                id: document.id.clone(),
            });
        }

        sqlx::query("DELETE FROM document_lines WHERE document_id = ?1")
            .bind(&document.id)
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut tx, &document.id, &document.lines).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Writes status, timestamps and acceptance, provided the stored
    /// status is still `expected`.
    pub async fn update_status(&self, document: &Document, expected: DocumentStatus) -> DbResult<()> {
        debug!(
            id = %document.id,
            from = ?expected,
            to = ?document.status,
            "Updating document status"
        );

        let acceptance = document.acceptance.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                status = ?3,
                sent_at = ?4,
                responded_at = ?5,
                acceptance_signature = ?6,
                acceptance_location = ?7,
                acceptance_date = ?8,
                updated_at = ?9
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(&document.id)
        .bind(expected)
        .bind(document.status)
        .bind(document.sent_at)
        .bind(document.responded_at)
        .bind(acceptance.and_then(|a| a.signature.clone()))
        .bind(acceptance.map(|a| a.location.clone()))
        .bind(acceptance.map(|a| a.date.clone()))
        .bind(document.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::StaleWrite {
                entity: "Document".to_string(),
                id: document.id.clone(),
            });
        }
        Ok(())
    }

    /// Gets a document with its lines by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Document>> {
        self.fetch_one_where("id", id).await
    }

    /// Gets a document by its number (`10001`, `Q-10001`, `R-10001`).
    pub async fn get_by_number(&self, document_number: &str) -> DbResult<Option<Document>> {
        self.fetch_one_where("document_number", document_number).await
    }

    /// Gets a document by the token in the customer's response link.
    pub async fn get_by_token(&self, public_token: &str) -> DbResult<Option<Document>> {
        self.fetch_one_where("public_token", public_token).await
    }

    async fn fetch_one_where(&self, column: &'static str, value: &str) -> DbResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM documents WHERE {} = ?1",
            COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.lines(&row.id).await?;
                Ok(Some(row.into_document(lines)?))
            }
            None => Ok(None),
        }
    }

    /// Lists documents, newest first.
    pub async fn list(&self, filter: &DocumentFilter) -> DbResult<Vec<Document>> {
        debug!(?filter, "Listing documents");

        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM documents
            WHERE (?1 IS NULL OR document_type = ?1)
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR customer_id = ?3)
            ORDER BY created_at DESC, document_number DESC
            LIMIT ?4
            "#,
            COLUMNS
        ))
        .bind(filter.document_type)
        .bind(filter.status)
        .bind(&filter.customer_id)
        .bind(filter.limit.map(i64::from).unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.lines(&row.id).await?;
            documents.push(row.into_document(lines)?);
        }
        Ok(documents)
    }

    /// Lines of a document in print order.
    pub async fn lines(&self, document_id: &str) -> DbResult<Vec<DocumentLine>> {
        let rows: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT position, kind, reference, name,
                   base_price_cents, surcharge_cents, price_cents
            FROM document_lines
            WHERE document_id = ?1
            ORDER BY position
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DocumentLine::from).collect())
    }

    /// Counts documents of a type (for diagnostics and seeding).
    pub async fn count(&self, document_type: DocumentType) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE document_type = ?1")
            .bind(document_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn insert_lines(
    tx: &mut Transaction<'_, Sqlite>,
    document_id: &str,
    lines: &[DocumentLine],
) -> DbResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO document_lines (
                document_id, position, kind, reference, name,
                base_price_cents, surcharge_cents, price_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(document_id)
        .bind(line.position)
        .bind(line.kind)
        .bind(&line.reference)
        .bind(&line.name)
        .bind(line.base_price.cents())
        .bind(line.surcharge.cents())
        .bind(line.price.cents())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use offerten_core::document::{CustomerResponse, PricedDocument};

    async fn repo() -> DocumentRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().documents()
    }

    fn priced(document_type: DocumentType) -> PricedDocument {
        PricedDocument {
            document_type,
            customer_id: None,
            customer: CustomerSnapshot {
                name: "Familie Meier".to_string(),
                email: Some("meier@example.ch".to_string()),
                ..Default::default()
            },
            lines: vec![
                DocumentLine {
                    position: 1,
                    kind: LineKind::Category,
                    reference: "UMZUG".to_string(),
                    name: "Umzug".to_string(),
                    base_price: Money::from_francs(1200),
                    surcharge: Money::zero(),
                    price: Money::from_francs(1200),
                },
                DocumentLine {
                    position: 2,
                    kind: LineKind::AddOn,
                    reference: "svc-1".to_string(),
                    name: "Stundensatz".to_string(),
                    base_price: Money::from_francs(120),
                    surcharge: Money::from_francs(60),
                    price: Money::from_francs(180),
                },
            ],
            workers: 4,
            rooms: 3,
            trucks: 1,
            base_override: None,
            subtotal: Money::from_francs(1380),
            tax_enabled: false,
            tax_rate: TaxRate::from_bps(810),
            tax_amount: Money::zero(),
            total: Money::from_francs(1380),
            notes: Some("3. Stock ohne Lift".to_string()),
        }
    }

    fn document(document_type: DocumentType, number: &str) -> Document {
        Document::issue(priced(document_type), number.to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let repo = repo().await;
        let document = document(DocumentType::Quote, "10001");
        repo.insert(&document).await.unwrap();

        let loaded = repo.get_by_id(&document.id).await.unwrap().unwrap();
        assert_eq!(loaded.document_number, "10001");
        assert_eq!(loaded.status, DocumentStatus::Draft);
        assert_eq!(loaded.lines, document.lines);
        assert_eq!(loaded.customer, document.customer);
        assert_eq!(loaded.total, Money::from_francs(1380));
        assert_eq!(loaded.notes.as_deref(), Some("3. Stock ohne Lift"));
        loaded.verify_totals().unwrap();

        let by_token = repo.get_by_token(&document.public_token).await.unwrap().unwrap();
        assert_eq!(by_token.id, document.id);
        assert!(repo.get_by_number("99999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_current_max_is_numeric_and_per_type() {
        let repo = repo().await;
        assert!(repo.current_max_number(DocumentType::Invoice).await.unwrap().is_none());

        for number in ["R-99999", "R-100000", "R-10001"] {
            repo.insert(&document(DocumentType::Invoice, number)).await.unwrap();
        }
        repo.insert(&document(DocumentType::Receipt, "Q-10005")).await.unwrap();

        assert_eq!(
            repo.current_max_number(DocumentType::Invoice).await.unwrap().as_deref(),
            Some("R-100000")
        );
        assert_eq!(
            repo.current_max_number(DocumentType::Receipt).await.unwrap().as_deref(),
            Some("Q-10005")
        );
        assert!(repo.current_max_number(DocumentType::Quote).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_number_writes_nothing() {
        let repo = repo().await;
        repo.insert(&document(DocumentType::Quote, "10001")).await.unwrap();

        let err = repo
            .insert(&document(DocumentType::Quote, "10001"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("documents.document_number"));

        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_lines")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(lines, 2);
    }

    #[tokio::test]
    async fn test_status_update_with_acceptance() {
        let repo = repo().await;
        let mut quote = document(DocumentType::Quote, "10001");
        repo.insert(&quote).await.unwrap();

        quote.mark_sent(Utc::now()).unwrap();
        repo.update_status(&quote, DocumentStatus::Draft).await.unwrap();

        quote
            .respond(
                CustomerResponse::Accept(Acceptance {
                    signature: Some("data:image/png;base64,AAAA".to_string()),
                    location: "Zürich".to_string(),
                    date: "18.10.2026".to_string(),
                }),
                Utc::now(),
            )
            .unwrap();
        repo.update_status(&quote, DocumentStatus::Sent).await.unwrap();

        let loaded = repo.get_by_id(&quote.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Accepted);
        assert_eq!(loaded.acceptance, quote.acceptance);
        assert!(loaded.sent_at.is_some());
        assert!(loaded.responded_at.is_some());

        // A second writer that still thinks the quote is "sent" loses
        let err = repo.update_status(&quote, DocumentStatus::Sent).await.unwrap_err();
        assert!(matches!(err, DbError::StaleWrite { .. }));
    }

    #[tokio::test]
    async fn test_update_pricing_replaces_lines_until_locked() {
        let repo = repo().await;
        let mut invoice = document(DocumentType::Invoice, "R-10001");
        repo.insert(&invoice).await.unwrap();

        let mut repriced = priced(DocumentType::Invoice);
        repriced.lines.truncate(1);
        repriced.workers = 2;
        repriced.subtotal = Money::from_francs(1200);
        repriced.total = Money::from_francs(1200);
        invoice.revise(repriced, Utc::now()).unwrap();
        repo.update_pricing(&invoice).await.unwrap();

        let loaded = repo.get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded.lines.len(), 1);
        assert_eq!(loaded.total, Money::from_francs(1200));
        loaded.verify_totals().unwrap();

        invoice.complete(Utc::now()).unwrap();
        repo.update_status(&invoice, DocumentStatus::Draft).await.unwrap();

        let err = repo.update_pricing(&invoice).await.unwrap_err();
        assert!(matches!(err, DbError::StaleWrite { .. }));
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let repo = repo().await;
        repo.insert(&document(DocumentType::Quote, "10001")).await.unwrap();
        repo.insert(&document(DocumentType::Quote, "10002")).await.unwrap();
        repo.insert(&document(DocumentType::Invoice, "R-10001")).await.unwrap();

        let all = repo.list(&DocumentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let quotes = repo
            .list(&DocumentFilter {
                document_type: Some(DocumentType::Quote),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(quotes.len(), 2);
        assert!(quotes.iter().all(|d| d.lines.len() == 2));

        let limited = repo
            .list(&DocumentFilter {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        assert_eq!(repo.count(DocumentType::Quote).await.unwrap(), 2);
    }
}
