//! # Document Issuer
//!
//! Turns an admin panel request into a stored, numbered document and moves
//! documents through their lifecycle.
//!
//! ## Issuing a Document
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       issue(request)                                    │
//! │                                                                         │
//! │  1. settings().get()          MWST + estimated hours                   │
//! │  2. resolve ids               categories, add-ons, customer snapshot   │
//! │  3. PricedDocument::assemble  validate, price, freeze lines            │
//! │                                                                         │
//! │  ┌──── attempt 1..=max_attempts ───────────────────────────────────┐   │
//! │  │ 4. current_max_number(type)                                     │   │
//! │  │ 5. allocate_next(series, max)                                   │   │
//! │  │ 6. insert document + lines (one transaction)                    │   │
//! │  │       │                                                         │   │
//! │  │       ├── Ok ───────────────────────────► return document       │   │
//! │  │       ├── UNIQUE(document_number) ──────► warn, next attempt    │   │
//! │  │       └── anything else ────────────────► return error          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  7. all attempts collided ──► DbError::AllocationConflict              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pricing happens once, before the loop. A retry only re-reads the
//! current maximum; the priced lines are reused as they are.

use std::future::Future;

use chrono::Utc;
use offerten_core::document::{CategorySelection, CustomerResponse, DocumentInput, PricedDocument};
use offerten_core::mail::{CompanyProfile, DocumentMail};
use offerten_core::money::Money;
use offerten_core::numbering::{allocate_next, Series};
use offerten_core::types::{Customer, CustomerSnapshot, Document, DocumentType};
use offerten_core::validation;
use offerten_core::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;

const DOCUMENT_NUMBER_COLUMN: &str = "documents.document_number";
const CUSTOMER_NUMBER_COLUMN: &str = "customers.customer_number";

// =============================================================================
// Request
// =============================================================================

/// A chosen service category by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryChoice {
    pub category_id: String,
    /// Amount for `custom` categories; ignored otherwise.
    #[serde(default)]
    pub custom_amount: Option<Money>,
}

/// What the admin panel submits to create or edit a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub document_type: DocumentType,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Printed contact details. Taken from the customer record when absent.
    #[serde(default)]
    pub customer: Option<CustomerSnapshot>,
    #[serde(default)]
    pub categories: Vec<CategoryChoice>,
    #[serde(default)]
    pub add_on_ids: Vec<String>,
    pub workers: i32,
    #[serde(default)]
    pub rooms: i32,
    #[serde(default)]
    pub trucks: i32,
    #[serde(default)]
    pub base_override: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Issuer
// =============================================================================

/// Issues documents and customers with unique numbers.
///
/// Get one from [`Database::issuer`].
#[derive(Debug, Clone)]
pub struct DocumentIssuer {
    db: Database,
    max_attempts: u32,
}

impl DocumentIssuer {
    pub fn new(db: Database, max_attempts: u32) -> Self {
        DocumentIssuer {
            db,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Prices `request` with the current settings and stores it under the
    /// next free number of its series.
    ///
    /// ## Errors
    /// - `NotFound` for unknown category, add-on or customer ids
    /// - `Core(Validation | InvalidPriceConfig)` for a bad selection
    /// - `AllocationConflict` when every attempt lost the race
    pub async fn issue(&self, request: &DocumentRequest) -> DbResult<Document> {
        let settings = self.db.settings().get().await?;
        let input = self.resolve(request).await?;
        let priced = PricedDocument::assemble(input, &settings, None)?;

        self.issue_priced(priced).await
    }

    /// Stores an already priced document under the next free number.
    pub async fn issue_priced(&self, priced: PricedDocument) -> DbResult<Document> {
        let document_type = priced.document_type;
        let series = document_type.series();
        let documents = self.db.documents();

        let document = self
            .retry_on_collision(series, DOCUMENT_NUMBER_COLUMN, || {
                let documents = documents.clone();
                let priced = priced.clone();
                async move {
                    let current = documents.current_max_number(document_type).await?;
                    let number = allocate_next(series, current.as_deref())?;
                    let document = Document::issue(priced, number, Utc::now());
                    documents.insert(&document).await?;
                    Ok(document)
                }
            })
            .await?;

        info!(
            id = %document.id,
            document_number = %document.document_number,
            document_type = ?document.document_type,
            total = %document.total,
            "Document issued"
        );
        Ok(document)
    }

    /// Re-prices an existing draft or sent document with the current
    /// settings. Number, token and status are kept.
    ///
    /// ## Errors
    /// - `Core(DocumentLocked)` once accepted, rejected or completed
    /// - `StaleWrite` if the status changed while re-pricing
    pub async fn revise(&self, document_id: &str, request: &DocumentRequest) -> DbResult<Document> {
        let mut document = self.load(document_id).await?;
        document.ensure_editable()?;

        let settings = self.db.settings().get().await?;
        let input = self.resolve(request).await?;
        let priced = PricedDocument::assemble(input, &settings, Some(&document))?;

        document.revise(priced, Utc::now())?;
        self.db.documents().update_pricing(&document).await?;

        info!(
            document_number = %document.document_number,
            total = %document.total,
            "Document revised"
        );
        Ok(document)
    }

    /// Records that the document was emailed. Re-sending is allowed.
    pub async fn mark_sent(&self, document_id: &str) -> DbResult<Document> {
        let mut document = self.load(document_id).await?;
        let expected = document.status;

        document.mark_sent(Utc::now())?;
        self.db.documents().update_status(&document, expected).await?;

        info!(document_number = %document.document_number, "Document marked as sent");
        Ok(document)
    }

    /// Applies the customer's answer from the public response page.
    pub async fn respond(&self, public_token: &str, response: CustomerResponse) -> DbResult<Document> {
        let mut document = self
            .db
            .documents()
            .get_by_token(public_token)
            .await?
            .ok_or_else(|| DbError::not_found("Document", "response link"))?;
        let expected = document.status;

        document.respond(response, Utc::now())?;
        self.db.documents().update_status(&document, expected).await?;

        info!(
            document_number = %document.document_number,
            status = ?document.status,
            "Customer responded"
        );
        Ok(document)
    }

    /// Closes a document.
    pub async fn complete(&self, document_id: &str) -> DbResult<Document> {
        let mut document = self.load(document_id).await?;
        let expected = document.status;

        document.complete(Utc::now())?;
        self.db.documents().update_status(&document, expected).await?;

        info!(document_number = %document.document_number, "Document completed");
        Ok(document)
    }

    /// Builds the outgoing mail for a stored document.
    pub async fn compose_mail(&self, document_id: &str, company: &CompanyProfile) -> DbResult<DocumentMail> {
        let document = self.load(document_id).await?;
        Ok(DocumentMail::compose(&document, company)?)
    }

    /// Creates a customer under the next free `K-` number.
    pub async fn create_customer(&self, contact: &CustomerSnapshot) -> DbResult<Customer> {
        validation::validate_customer_snapshot(contact)?;

        let customers = self.db.customers();
        let mut contact = contact.clone();
        contact.name = contact.name.trim().to_string();

        let customer = self
            .retry_on_collision(Series::Customer, CUSTOMER_NUMBER_COLUMN, || {
                let customers = customers.clone();
                let contact = contact.clone();
                async move {
                    let current = customers.current_max_number().await?;
                    let number = allocate_next(Series::Customer, current.as_deref())?;
                    let now = Utc::now();
                    let customer = Customer {
                        id: Uuid::new_v4().to_string(),
                        customer_number: number,
                        contact,
                        created_at: now,
                        updated_at: now,
                    };
                    customers.insert(&customer).await?;
                    Ok(customer)
                }
            })
            .await?;

        info!(customer_number = %customer.customer_number, "Customer created");
        Ok(customer)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn load(&self, document_id: &str) -> DbResult<Document> {
        self.db
            .documents()
            .get_by_id(document_id)
            .await?
            .ok_or_else(|| DbError::not_found("Document", document_id))
    }

    /// Loads the catalog entries and customer a request points at.
    async fn resolve(&self, request: &DocumentRequest) -> DbResult<DocumentInput> {
        let catalog = self.db.catalog();

        let mut categories = Vec::with_capacity(request.categories.len());
        for choice in &request.categories {
            let category = catalog
                .get_category(&choice.category_id)
                .await?
                .ok_or_else(|| DbError::not_found("Service category", &choice.category_id))?;
            categories.push(CategorySelection {
                category,
                custom_amount: choice.custom_amount,
            });
        }

        let mut add_ons = Vec::with_capacity(request.add_on_ids.len());
        for id in &request.add_on_ids {
            let service = catalog
                .get_service(id)
                .await?
                .ok_or_else(|| DbError::not_found("Additional service", id))?;
            add_ons.push(service);
        }

        let record = match &request.customer_id {
            Some(id) => Some(
                self.db
                    .customers()
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Customer", id))?,
            ),
            None => None,
        };

        let customer = match (&request.customer, &record) {
            (Some(snapshot), _) => snapshot.clone(),
            (None, Some(record)) => record.snapshot(),
            (None, None) => {
                return Err(ValidationError::Required {
                    field: "customer".to_string(),
                }
                .into())
            }
        };

        Ok(DocumentInput {
            document_type: request.document_type,
            customer_id: request.customer_id.clone(),
            customer,
            categories,
            add_ons,
            workers: request.workers,
            rooms: request.rooms,
            trucks: request.trucks,
            base_override: request.base_override,
            notes: request.notes.clone(),
        })
    }

    /// Runs `attempt` until it stops failing with a unique violation on
    /// `column`, at most `max_attempts` times.
    async fn retry_on_collision<T, F, Fut>(
        &self,
        series: Series,
        column: &str,
        mut attempt: F,
    ) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        for n in 1..=self.max_attempts {
            match attempt().await {
                Err(err) if err.is_unique_violation_on(column) => {
                    warn!(
                        %series,
                        attempt = n,
                        max_attempts = self.max_attempts,
                        "Number taken by a concurrent writer, retrying"
                    );
                }
                result => return result,
            }
        }

        Err(DbError::AllocationConflict {
            series: series.to_string(),
            attempts: self.max_attempts,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
