//! # Document Module
//!
//! Turns a selection into a price-frozen document and guards its status.
//!
//! ## Save Flow
//! ```text
//! ┌──────────────┐   ┌──────────────────────┐   ┌──────────────┐
//! │ DocumentInput│──►│ PricedDocument::     │──►│ PricedDocument│
//! │ (catalog     │   │   assemble()         │   │ lines + totals│
//! │  entries,    │   │  validate → price()  │   │ (frozen)      │
//! │  counts)     │   │  → freeze lines      │   └──────┬───────┘
//! └──────────────┘   └──────────────────────┘          │
//!                                        number allocated by offerten-db
//!                                                       ▼
//!                                          Document::issue() / revise()
//! ```
//!
//! ## Lifecycle
//! ```text
//!            ┌──── sent ◄─┐ (re-send)
//!  draft ────┤     │ └────┘
//!            │     ├──► accepted ──► completed      quotes only
//!            │     └──► rejected                    quotes only
//!            └─────────► completed                  receipts / invoices
//! ```
//! Only `draft` and `sent` documents can be re-priced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{price, AddOn, BaseComponent, PricingRequest};
use crate::types::{
    Acceptance, AdditionalService, CustomerSnapshot, Document, DocumentLine, DocumentStatus,
    DocumentType, LineKind, PricingModel, PricingSettings, ServiceCategory, TaxRate,
};
use crate::validation;

// =============================================================================
// Input
// =============================================================================

/// A chosen category, resolved from the catalog by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategorySelection {
    pub category: ServiceCategory,
    /// Amount for `custom` categories.
    pub custom_amount: Option<Money>,
}

/// Everything the admin panel (or the public form) submits for one document.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentInput {
    pub document_type: DocumentType,
    pub customer_id: Option<String>,
    pub customer: CustomerSnapshot,
    pub categories: Vec<CategorySelection>,
    /// Selected add-ons only.
    pub add_ons: Vec<AdditionalService>,
    pub workers: i32,
    pub rooms: i32,
    pub trucks: i32,
    pub base_override: Option<Money>,
    pub notes: Option<String>,
}

// =============================================================================
// Priced Document
// =============================================================================

/// Lines and totals ready to be stored. Carries no number yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedDocument {
    pub document_type: DocumentType,
    pub customer_id: Option<String>,
    pub customer: CustomerSnapshot,
    pub lines: Vec<DocumentLine>,
    pub workers: i32,
    pub rooms: i32,
    pub trucks: i32,
    pub base_override: Option<Money>,
    pub subtotal: Money,
    pub tax_enabled: bool,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub total: Money,
    pub notes: Option<String>,
}

impl PricedDocument {
    /// Validates, prices and freezes a selection.
    ///
    /// `previous` is the stored document when an existing one is edited.
    /// Catalog entries that were deactivated in the meantime stay valid as
    /// long as they already sit on it.
    ///
    /// ## Errors
    /// - `Validation` for bad input, inactive entries or an empty selection
    /// - `InvalidPriceConfig` from the pricing engine
    pub fn assemble(
        input: DocumentInput,
        settings: &PricingSettings,
        previous: Option<&Document>,
    ) -> CoreResult<Self> {
        validation::validate_customer_snapshot(&input.customer)?;
        validation::validate_workers(input.workers)?;
        validation::validate_units("rooms", input.rooms)?;
        validation::validate_units("trucks", input.trucks)?;
        validation::validate_notes(input.notes.as_deref())?;
        if let Some(amount) = input.base_override {
            validation::validate_amount("manual base price", amount)?;
        }

        if let Some(previous) = previous {
            if previous.document_type != input.document_type {
                return Err(ValidationError::InvalidFormat {
                    field: "document type".to_string(),
                    reason: "an issued document keeps its type".to_string(),
                }
                .into());
            }
        }

        let on_previous = |kind: LineKind, reference: &str| {
            previous.map_or(false, |doc| {
                doc.lines
                    .iter()
                    .any(|line| line.kind == kind && line.reference == reference)
            })
        };

        for selection in &input.categories {
            let category = &selection.category;
            if !category.active && !on_previous(LineKind::Category, &category.code) {
                return Err(ValidationError::Inactive {
                    field: "category".to_string(),
                    name: category.name.clone(),
                }
                .into());
            }
        }
        for service in &input.add_ons {
            if !service.active && !on_previous(LineKind::AddOn, &service.id) {
                return Err(ValidationError::Inactive {
                    field: "additional service".to_string(),
                    name: service.name.clone(),
                }
                .into());
            }
        }

        if input.categories.is_empty() && input.base_override.is_none() {
            return Err(ValidationError::Required {
                field: "service category".to_string(),
            }
            .into());
        }

        let request = PricingRequest {
            base_components: input
                .categories
                .iter()
                .map(|s| BaseComponent::from_category(&s.category, s.custom_amount))
                .collect(),
            add_ons: input
                .add_ons
                .iter()
                .map(|s| AddOn::from_service(s, true))
                .collect(),
            workers: input.workers,
            estimated_hours: settings.estimated_hours,
            tax: settings.tax,
            manual_base_override: input.base_override,
        };
        let result = price(&request)?;

        let mut lines = Vec::with_capacity(input.categories.len() + input.add_ons.len());

        for (index, selection) in input.categories.iter().enumerate() {
            let category = &selection.category;
            let catalog_price = match category.pricing_model {
                PricingModel::Fixed => category.base_price,
                PricingModel::Hourly => category.hourly_rate,
                PricingModel::Custom => selection.custom_amount,
            }
            .unwrap_or_default();

            // Under a manual override the categories are listed but priced at zero.
            let contribution = result
                .base_contributions
                .get(index)
                .copied()
                .unwrap_or_default();

            lines.push(DocumentLine {
                position: lines.len() as i32 + 1,
                kind: LineKind::Category,
                reference: category.code.clone(),
                name: category.name.clone(),
                base_price: catalog_price,
                surcharge: Money::zero(),
                price: contribution,
            });
        }

        for (service, adjusted) in input.add_ons.iter().zip(&result.add_ons) {
            lines.push(DocumentLine {
                position: lines.len() as i32 + 1,
                kind: LineKind::AddOn,
                reference: service.id.clone(),
                name: adjusted.name.clone(),
                base_price: adjusted.base_price,
                surcharge: adjusted.surcharge,
                price: adjusted.adjusted_price,
            });
        }

        Ok(PricedDocument {
            document_type: input.document_type,
            customer_id: input.customer_id,
            customer: input.customer,
            lines,
            workers: input.workers,
            rooms: input.rooms,
            trucks: input.trucks,
            base_override: input.base_override,
            subtotal: result.subtotal,
            tax_enabled: settings.tax.enabled,
            tax_rate: settings.tax.rate,
            tax_amount: result.tax_amount,
            total: result.total,
            notes: input.notes,
        })
    }
}

// =============================================================================
// Customer Response
// =============================================================================

/// What the customer answers on the public response page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum CustomerResponse {
    Accept(Acceptance),
    Reject,
}

// =============================================================================
// Document Behavior
// =============================================================================

/// Whether `from → to` is a legal step for a document of `document_type`.
pub fn can_transition(document_type: DocumentType, from: DocumentStatus, to: DocumentStatus) -> bool {
    use DocumentStatus::*;

    let is_quote = document_type == DocumentType::Quote;
    match (from, to) {
        (Draft, Sent) | (Sent, Sent) => true,
        (Sent, Accepted) | (Sent, Rejected) => is_quote,
        (Accepted, Completed) => is_quote,
        (Draft, Completed) | (Sent, Completed) => !is_quote,
        _ => false,
    }
}

impl Document {
    /// Creates a new draft from a priced selection and its allocated number.
    pub fn issue(priced: PricedDocument, document_number: String, now: DateTime<Utc>) -> Self {
        Document {
            id: Uuid::new_v4().to_string(),
            document_number,
            document_type: priced.document_type,
            status: DocumentStatus::Draft,
            customer_id: priced.customer_id,
            customer: priced.customer,
            lines: priced.lines,
            workers: priced.workers,
            rooms: priced.rooms,
            trucks: priced.trucks,
            base_override: priced.base_override,
            subtotal: priced.subtotal,
            tax_enabled: priced.tax_enabled,
            tax_rate: priced.tax_rate,
            tax_amount: priced.tax_amount,
            total: priced.total,
            notes: priced.notes,
            public_token: Uuid::new_v4().simple().to_string(),
            acceptance: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
            responded_at: None,
        }
    }

    /// True once the document can no longer be re-priced.
    pub fn is_locked(&self) -> bool {
        !matches!(self.status, DocumentStatus::Draft | DocumentStatus::Sent)
    }

    /// Fails with `DocumentLocked` for accepted, rejected or completed documents.
    pub fn ensure_editable(&self) -> CoreResult<()> {
        if self.is_locked() {
            return Err(CoreError::DocumentLocked {
                document_number: self.document_number.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Replaces lines and totals with a fresh pricing. Number, token and
    /// status stay.
    pub fn revise(&mut self, priced: PricedDocument, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_editable()?;

        self.customer_id = priced.customer_id;
        self.customer = priced.customer;
        self.lines = priced.lines;
        self.workers = priced.workers;
        self.rooms = priced.rooms;
        self.trucks = priced.trucks;
        self.base_override = priced.base_override;
        self.subtotal = priced.subtotal;
        self.tax_enabled = priced.tax_enabled;
        self.tax_rate = priced.tax_rate;
        self.tax_amount = priced.tax_amount;
        self.total = priced.total;
        self.notes = priced.notes;
        self.updated_at = now;

        Ok(())
    }

    /// Moves the document to `to`, stamping the matching timestamp.
    pub fn transition(&mut self, to: DocumentStatus, now: DateTime<Utc>) -> CoreResult<()> {
        if !can_transition(self.document_type, self.status, to) {
            return Err(CoreError::InvalidStatusTransition {
                document_number: self.document_number.clone(),
                from: self.status,
                to,
            });
        }

        match to {
            DocumentStatus::Sent => self.sent_at = Some(now),
            DocumentStatus::Accepted | DocumentStatus::Rejected => self.responded_at = Some(now),
            _ => {}
        }
        self.status = to;
        self.updated_at = now;

        Ok(())
    }

    /// Called after the email went out. Re-sending is allowed.
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(DocumentStatus::Sent, now)
    }

    /// Records the customer's answer to a sent quote.
    pub fn respond(&mut self, response: CustomerResponse, now: DateTime<Utc>) -> CoreResult<()> {
        match response {
            CustomerResponse::Accept(acceptance) => {
                validation::validate_acceptance(&acceptance)?;
                self.transition(DocumentStatus::Accepted, now)?;
                self.acceptance = Some(acceptance);
            }
            CustomerResponse::Reject => self.transition(DocumentStatus::Rejected, now)?,
        }
        Ok(())
    }

    /// Closes the document: move done, or receipt/invoice settled.
    pub fn complete(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(DocumentStatus::Completed, now)
    }

    /// Recomputes subtotal, tax and total from the stored lines.
    ///
    /// Renderers never recompute; this is for integrity checks after load.
    pub fn verify_totals(&self) -> CoreResult<()> {
        let sum_of = |kind: LineKind| -> Money {
            self.lines
                .iter()
                .filter(|line| line.kind == kind)
                .map(|line| line.price)
                .sum()
        };

        let base = self
            .base_override
            .unwrap_or_else(|| sum_of(LineKind::Category));
        let subtotal = base + sum_of(LineKind::AddOn);
        let tax_amount = if self.tax_enabled {
            subtotal.calculate_tax(self.tax_rate)
        } else {
            Money::zero()
        };
        let total = subtotal + tax_amount;

        let mismatch = |what: &str, stored: Money, computed: Money| CoreError::TotalsMismatch {
            document_number: self.document_number.clone(),
            detail: format!("{} stored {} but lines give {}", what, stored, computed),
        };

        if subtotal != self.subtotal {
            return Err(mismatch("subtotal", self.subtotal, subtotal));
        }
        if tax_amount != self.tax_amount {
            return Err(mismatch("tax", self.tax_amount, tax_amount));
        }
        if total != self.total {
            return Err(mismatch("total", self.total, total));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaxConfig;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn category(code: &str, model: PricingModel, amount: i64) -> ServiceCategory {
        ServiceCategory {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: code.to_lowercase(),
            pricing_model: model,
            base_price: (model == PricingModel::Fixed).then(|| Money::from_francs(amount)),
            hourly_rate: (model == PricingModel::Hourly).then(|| Money::from_francs(amount)),
            active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn service(name: &str, francs: i64, surcharge: bool) -> AdditionalService {
        AdditionalService {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price: Money::from_francs(francs),
            applies_worker_surcharge: surcharge,
            active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn input(document_type: DocumentType) -> DocumentInput {
        DocumentInput {
            document_type,
            customer_id: None,
            customer: CustomerSnapshot {
                name: "Familie Meier".to_string(),
                email: Some("meier@example.ch".to_string()),
                ..Default::default()
            },
            categories: vec![CategorySelection {
                category: category("UMZUG", PricingModel::Fixed, 1200),
                custom_amount: None,
            }],
            add_ons: vec![
                service("Reinigung", 300, false),
                service("Stundensatz", 120, true),
            ],
            workers: 4,
            rooms: 3,
            trucks: 1,
            base_override: None,
            notes: None,
        }
    }

    fn settings() -> PricingSettings {
        PricingSettings {
            tax: TaxConfig::enabled(TaxRate::from_bps(770)),
            estimated_hours: 4,
        }
    }

    fn issued(document_type: DocumentType) -> Document {
        let priced = PricedDocument::assemble(input(document_type), &settings(), None).unwrap();
        Document::issue(priced, "10001".to_string(), now())
    }

    #[test]
    fn test_assemble_freezes_lines_and_totals() {
        let priced = PricedDocument::assemble(input(DocumentType::Quote), &settings(), None).unwrap();

        assert_eq!(priced.lines.len(), 3);
        assert_eq!(priced.lines[0].kind, LineKind::Category);
        assert_eq!(priced.lines[0].reference, "UMZUG");
        assert_eq!(priced.lines[0].price, Money::from_francs(1200));

        let stundensatz = &priced.lines[2];
        assert_eq!(stundensatz.position, 3);
        assert_eq!(stundensatz.base_price, Money::from_francs(120));
        assert_eq!(stundensatz.surcharge, Money::from_francs(60));
        assert_eq!(stundensatz.price, Money::from_francs(180));

        // 1200 + 300 + 180 = 1680, 7.7% = 129.36
        assert_eq!(priced.subtotal, Money::from_francs(1680));
        assert_eq!(priced.tax_amount, Money::from_francs_rappen(129, 36));
        assert_eq!(priced.total, Money::from_francs_rappen(1809, 36));
    }

    #[test]
    fn test_assemble_uses_settings_hours() {
        let mut input = input(DocumentType::Receipt);
        input.categories = vec![CategorySelection {
            category: category("UMZUG", PricingModel::Hourly, 150),
            custom_amount: None,
        }];
        input.add_ons.clear();
        input.workers = 2;

        let settings = PricingSettings {
            tax: TaxConfig::disabled(TaxRate::from_bps(810)),
            estimated_hours: 6,
        };
        let priced = PricedDocument::assemble(input, &settings, None).unwrap();

        assert_eq!(priced.total, Money::from_francs(1800));
        assert!(!priced.tax_enabled);
    }

    #[test]
    fn test_assemble_with_override_zeroes_category_lines() {
        let mut input = input(DocumentType::Invoice);
        input.base_override = Some(Money::from_francs(900));
        input.add_ons.clear();

        let priced = PricedDocument::assemble(input, &settings(), None).unwrap();
        assert_eq!(priced.lines[0].price, Money::zero());
        assert_eq!(priced.lines[0].base_price, Money::from_francs(1200));
        assert_eq!(priced.subtotal, Money::from_francs(900));
    }

    #[test]
    fn test_assemble_requires_a_category_or_override() {
        let mut input = input(DocumentType::Quote);
        input.categories.clear();

        let err = PricedDocument::assemble(input.clone(), &settings(), None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));

        input.base_override = Some(Money::from_francs(500));
        assert!(PricedDocument::assemble(input, &settings(), None).is_ok());
    }

    #[test]
    fn test_inactive_entries_rejected_for_new_documents() {
        let mut input = input(DocumentType::Quote);
        input.add_ons[0].active = false;

        let err = PricedDocument::assemble(input, &settings(), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: additional service 'Reinigung' is no longer offered"
        );
    }

    #[test]
    fn test_inactive_entries_kept_on_existing_documents() {
        let original = input(DocumentType::Quote);
        let priced = PricedDocument::assemble(original.clone(), &settings(), None).unwrap();
        let document = Document::issue(priced, "10001".to_string(), now());

        let mut edited = original;
        edited.categories[0].category.active = false;
        edited.add_ons[0].active = false;
        edited.workers = 2;

        let repriced = PricedDocument::assemble(edited, &settings(), Some(&document)).unwrap();
        assert_eq!(repriced.subtotal, Money::from_francs(1620));
    }

    #[test]
    fn test_document_type_cannot_change_on_edit() {
        let document = issued(DocumentType::Quote);
        let result = PricedDocument::assemble(input(DocumentType::Invoice), &settings(), Some(&document));
        assert!(result.is_err());
    }

    #[test]
    fn test_pricing_errors_surface() {
        let mut input = input(DocumentType::Quote);
        input.categories[0].category = category("SPEZIAL", PricingModel::Custom, 0);

        let err = PricedDocument::assemble(input, &settings(), None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPriceConfig { .. }));
    }

    #[test]
    fn test_issue_starts_as_draft_with_token() {
        let document = issued(DocumentType::Quote);
        assert_eq!(document.status, DocumentStatus::Draft);
        assert_eq!(document.public_token.len(), 32);
        assert!(document.acceptance.is_none());
        document.verify_totals().unwrap();
    }

    #[test]
    fn test_quote_lifecycle() {
        let mut quote = issued(DocumentType::Quote);

        quote.mark_sent(now()).unwrap();
        quote.mark_sent(now()).unwrap();
        assert!(quote.sent_at.is_some());

        let acceptance = Acceptance {
            signature: None,
            location: "Bern".to_string(),
            date: "18.10.2026".to_string(),
        };
        quote
            .respond(CustomerResponse::Accept(acceptance.clone()), now())
            .unwrap();
        assert_eq!(quote.status, DocumentStatus::Accepted);
        assert_eq!(quote.acceptance, Some(acceptance));
        assert!(quote.responded_at.is_some());

        quote.complete(now()).unwrap();
        assert_eq!(quote.status, DocumentStatus::Completed);
    }

    #[test]
    fn test_quote_cannot_be_answered_before_sent() {
        let mut quote = issued(DocumentType::Quote);
        let err = quote.respond(CustomerResponse::Reject, now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_rejected_quote_is_final() {
        let mut quote = issued(DocumentType::Quote);
        quote.mark_sent(now()).unwrap();
        quote.respond(CustomerResponse::Reject, now()).unwrap();

        assert!(quote.respond(CustomerResponse::Reject, now()).is_err());
        assert!(quote.complete(now()).is_err());
        assert!(quote.mark_sent(now()).is_err());
    }

    #[test]
    fn test_invalid_acceptance_keeps_status() {
        let mut quote = issued(DocumentType::Quote);
        quote.mark_sent(now()).unwrap();

        let acceptance = Acceptance {
            signature: None,
            location: String::new(),
            date: "18.10.2026".to_string(),
        };
        assert!(quote.respond(CustomerResponse::Accept(acceptance), now()).is_err());
        assert_eq!(quote.status, DocumentStatus::Sent);
    }

    #[test]
    fn test_receipt_and_invoice_lifecycle() {
        let mut receipt = issued(DocumentType::Receipt);
        receipt.complete(now()).unwrap();
        assert_eq!(receipt.status, DocumentStatus::Completed);

        let mut invoice = issued(DocumentType::Invoice);
        invoice.mark_sent(now()).unwrap();
        assert!(invoice.respond(CustomerResponse::Reject, now()).is_err());
        invoice.complete(now()).unwrap();
    }

    #[test]
    fn test_quote_cannot_skip_to_completed() {
        assert!(!can_transition(
            DocumentType::Quote,
            DocumentStatus::Draft,
            DocumentStatus::Completed
        ));
        assert!(!can_transition(
            DocumentType::Quote,
            DocumentStatus::Sent,
            DocumentStatus::Completed
        ));
        assert!(!can_transition(
            DocumentType::Invoice,
            DocumentStatus::Completed,
            DocumentStatus::Draft
        ));
    }

    #[test]
    fn test_revise_replaces_pricing_until_locked() {
        let mut quote = issued(DocumentType::Quote);
        let token = quote.public_token.clone();

        let mut edited = input(DocumentType::Quote);
        edited.workers = 2;
        let priced = PricedDocument::assemble(edited.clone(), &settings(), Some(&quote)).unwrap();
        quote.revise(priced, now()).unwrap();

        assert_eq!(quote.subtotal, Money::from_francs(1620));
        assert_eq!(quote.public_token, token);
        assert_eq!(quote.document_number, "10001");

        quote.mark_sent(now()).unwrap();
        quote.respond(CustomerResponse::Reject, now()).unwrap();

        let priced = PricedDocument::assemble(edited, &settings(), Some(&quote)).unwrap();
        let err = quote.revise(priced, now()).unwrap_err();
        assert!(matches!(err, CoreError::DocumentLocked { .. }));
    }

    #[test]
    fn test_verify_totals_detects_tampering() {
        let mut document = issued(DocumentType::Invoice);
        document.verify_totals().unwrap();

        document.total = document.total + Money::from_cents(1);
        let err = document.verify_totals().unwrap_err();
        assert!(matches!(err, CoreError::TotalsMismatch { .. }));
        assert!(err.to_string().contains("total"));
    }

    #[test]
    fn test_customer_response_serde_shape() {
        let json = serde_json::to_value(CustomerResponse::Reject).unwrap();
        assert_eq!(json, serde_json::json!({ "response": "reject" }));

        let parsed: CustomerResponse = serde_json::from_value(serde_json::json!({
            "response": "accept",
            "signature": null,
            "location": "Luzern",
            "date": "01.11.2026"
        }))
        .unwrap();
        assert!(matches!(parsed, CustomerResponse::Accept(_)));
    }
}
