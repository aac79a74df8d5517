//! # Domain Types
//!
//! Core domain types used throughout Offerten.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog (admin-edited)          Document (issued, price-frozen)        │
//! │  ┌─────────────────────┐         ┌──────────────────────────────┐      │
//! │  │  ServiceCategory    │  copy   │  Document                    │      │
//! │  │  code, name,        │ ──────► │  document_number, type,      │      │
//! │  │  pricing_model,     │         │  customer (snapshot),        │      │
//! │  │  base/hourly price  │         │  lines: Vec<DocumentLine>,   │      │
//! │  ├─────────────────────┤         │  subtotal, tax, total,       │      │
//! │  │  AdditionalService  │ ──────► │  status, acceptance          │      │
//! │  │  name, price,       │         └──────────────────────────────┘      │
//! │  │  worker surcharge   │                                               │
//! │  └─────────────────────┘         Customer (own K- series)              │
//! │                                                                         │
//! │  TaxRate (bps) • TaxConfig • PricingSettings                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Documents never join back to the catalog. Names and prices are copied
//! into `DocumentLine`s at save time, so later catalog edits cannot rewrite
//! what a customer already signed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::numbering::Series;
use crate::DEFAULT_ESTIMATED_HOURS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 770 bps = 7.7% and 810 bps = 8.1% (MWST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Parses a percentage such as `7.7`, `8.10` or `8.1%` without going
/// through floating point.
impl FromStr for TaxRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "tax rate".to_string(),
            reason: format!("'{}' is not a percentage with at most two decimals", s),
        };

        let body = s.trim().trim_end_matches('%').trim();
        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));

        if whole.is_empty()
            || fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u32 = whole.parse().map_err(|_| invalid())?;
        let fraction: u32 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u32>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let bps = whole
            .checked_mul(100)
            .and_then(|b| b.checked_add(fraction))
            .ok_or_else(invalid)?;

        Ok(TaxRate(bps))
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let fraction = self.0 % 100;
        if fraction == 0 {
            write!(f, "{}%", whole)
        } else if fraction % 10 == 0 {
            write!(f, "{}.{}%", whole, fraction / 10)
        } else {
            write!(f, "{}.{:02}%", whole, fraction)
        }
    }
}

// =============================================================================
// Tax / Pricing Settings
// =============================================================================

/// Whether MWST is charged, and at which rate.
///
/// Passed into the pricing engine explicitly on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxConfig {
    pub enabled: bool,
    pub rate: TaxRate,
}

impl TaxConfig {
    /// Tax charged at the given rate.
    pub const fn enabled(rate: TaxRate) -> Self {
        TaxConfig {
            enabled: true,
            rate,
        }
    }

    /// No tax charged; the rate is kept for when it gets switched on.
    pub const fn disabled(rate: TaxRate) -> Self {
        TaxConfig {
            enabled: false,
            rate,
        }
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        TaxConfig::disabled(TaxRate::from_bps(810))
    }
}

/// The settings record the caller reads before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingSettings {
    pub tax: TaxConfig,
    /// Hours assumed for `hourly` categories.
    pub estimated_hours: u32,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            tax: TaxConfig::default(),
            estimated_hours: DEFAULT_ESTIMATED_HOURS,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// How a service category contributes to the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Flat `base_price`.
    Fixed,
    /// `hourly_rate × estimated hours × workers`.
    Hourly,
    /// Amount negotiated per job, entered on the document.
    Custom,
}

/// A selectable base service ("Umzug", "Reinigung", "Klaviertransport").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServiceCategory {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stable reference code copied onto documents (e.g. `UMZUG`).
    pub code: String,

    /// Display name shown in the admin panel and on the printout.
    pub name: String,

    pub pricing_model: PricingModel,

    /// Used when `pricing_model` is `fixed`.
    pub base_price: Option<Money>,

    /// Used when `pricing_model` is `hourly`.
    pub hourly_rate: Option<Money>,

    /// Inactive categories cannot be selected for new documents.
    pub active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// An optional add-on ("Reinigung", "Entsorgung", "Stundensatz").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdditionalService {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub name: String,

    /// Base rate before any surcharge.
    pub price: Money,

    /// Adds CHF 30 per worker above two. Set once when the entry is
    /// created (see [`infer_worker_surcharge`]); editable afterwards.
    pub applies_worker_surcharge: bool,

    pub active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Default for `applies_worker_surcharge` when a new add-on is entered.
///
/// Only the catalog uses this, at creation time. The pricing engine reads
/// the stored flag and never looks at names.
pub fn infer_worker_surcharge(name: &str) -> bool {
    name.to_lowercase().contains("stundensatz")
}

// =============================================================================
// Customer
// =============================================================================

/// Name, address and contact as printed on a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerSnapshot {
    pub name: String,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A customer record with its own `K-` number series.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    /// `K-10001`, `K-10002`, …
    pub customer_number: String,
    pub contact: CustomerSnapshot,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// The copy stored on a document.
    pub fn snapshot(&self) -> CustomerSnapshot {
        self.contact.clone()
    }
}

// =============================================================================
// Document Type / Status
// =============================================================================

/// Quote, receipt or invoice. One shape, one number series each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Offerte.
    Quote,
    /// Quittung.
    Receipt,
    /// Rechnung.
    Invoice,
}

impl DocumentType {
    /// The number series this type draws from.
    pub const fn series(&self) -> Series {
        match self {
            DocumentType::Quote => Series::Quote,
            DocumentType::Receipt => Series::Receipt,
            DocumentType::Invoice => Series::Invoice,
        }
    }

    /// German label as printed and mailed.
    pub const fn label(&self) -> &'static str {
        match self {
            DocumentType::Quote => "Offerte",
            DocumentType::Receipt => "Quittung",
            DocumentType::Invoice => "Rechnung",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentType::Quote => write!(f, "quote"),
            DocumentType::Receipt => write!(f, "receipt"),
            DocumentType::Invoice => write!(f, "invoice"),
        }
    }
}

impl FromStr for DocumentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quote" | "offerte" => Ok(DocumentType::Quote),
            "receipt" | "quittung" => Ok(DocumentType::Receipt),
            "invoice" | "rechnung" => Ok(DocumentType::Invoice),
            _ => Err(ValidationError::NotAllowed {
                field: "document type".to_string(),
                allowed: vec!["quote".into(), "receipt".into(), "invoice".into()],
            }),
        }
    }
}

/// The status of a document.
///
/// ```text
///  draft ──► sent ──► accepted ──► completed      (quotes)
///              │  └─► rejected
///              └────► completed                   (receipts, invoices)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Completed,
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Draft
    }
}

// =============================================================================
// Document Lines
// =============================================================================

/// What a frozen line was copied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Category,
    AddOn,
}

/// A price-frozen line on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentLine {
    /// Order on the printout, starting at 1.
    pub position: i32,
    pub kind: LineKind,
    /// Category code or add-on id at the time of saving.
    pub reference: String,
    /// Name at the time of saving (frozen).
    pub name: String,
    /// Catalog price at the time of saving (frozen).
    pub base_price: Money,
    /// Worker surcharge included in `price`.
    pub surcharge: Money,
    /// What the line contributes to the subtotal.
    pub price: Money,
}

// =============================================================================
// Acceptance
// =============================================================================

/// What the customer leaves behind when accepting a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Acceptance {
    /// Captured signature as a PNG data URL.
    pub signature: Option<String>,
    /// "Ort", as typed by the customer.
    pub location: String,
    /// "Datum", as typed by the customer.
    pub date: String,
}

// =============================================================================
// Document
// =============================================================================

/// A priced, issued quote / receipt / invoice.
///
/// `subtotal`, `tax_amount` and `total` are computed by the pricing engine
/// at save time and never edited directly. Renderers print them as stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Document {
    pub id: String,
    /// Series identifier: `10001`, `Q-10001` or `R-10001`.
    pub document_number: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,

    /// Customer record the snapshot was taken from, if any.
    pub customer_id: Option<String>,
    pub customer: CustomerSnapshot,

    pub lines: Vec<DocumentLine>,

    pub workers: i32,
    pub rooms: i32,
    pub trucks: i32,

    /// Manually agreed base price replacing the category lines' sum.
    pub base_override: Option<Money>,

    pub subtotal: Money,
    pub tax_enabled: bool,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub total: Money,

    pub notes: Option<String>,

    /// Unguessable token for the customer-facing response page.
    pub public_token: String,

    /// Present only once a quote was accepted.
    pub acceptance: Option<Acceptance>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub sent_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl Document {
    /// The tax configuration the document was priced with.
    pub fn tax_config(&self) -> TaxConfig {
        TaxConfig {
            enabled: self.tax_enabled,
            rate: self.tax_rate,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_parse() {
        assert_eq!("7.7".parse::<TaxRate>().unwrap().bps(), 770);
        assert_eq!("8.1%".parse::<TaxRate>().unwrap().bps(), 810);
        assert_eq!("8.10".parse::<TaxRate>().unwrap().bps(), 810);
        assert_eq!("0".parse::<TaxRate>().unwrap().bps(), 0);
        assert_eq!("2.55".parse::<TaxRate>().unwrap().bps(), 255);

        assert!("".parse::<TaxRate>().is_err());
        assert!("7.75.1".parse::<TaxRate>().is_err());
        assert!("7.777".parse::<TaxRate>().is_err());
        assert!("-1".parse::<TaxRate>().is_err());
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::from_bps(770).to_string(), "7.7%");
        assert_eq!(TaxRate::from_bps(800).to_string(), "8%");
        assert_eq!(TaxRate::from_bps(255).to_string(), "2.55%");
    }

    #[test]
    fn test_pricing_settings_default() {
        let settings = PricingSettings::default();
        assert_eq!(settings.estimated_hours, 4);
        assert!(!settings.tax.enabled);
    }

    #[test]
    fn test_infer_worker_surcharge() {
        assert!(infer_worker_surcharge("Stundensatz"));
        assert!(infer_worker_surcharge("Stundensatz Umzug"));
        assert!(infer_worker_surcharge("STUNDENSATZ"));
        assert!(!infer_worker_surcharge("Reinigung"));
    }

    #[test]
    fn test_document_type_series_and_labels() {
        assert_eq!(DocumentType::Quote.series(), Series::Quote);
        assert_eq!(DocumentType::Receipt.series(), Series::Receipt);
        assert_eq!(DocumentType::Invoice.series(), Series::Invoice);
        assert_eq!(DocumentType::Invoice.label(), "Rechnung");
    }

    #[test]
    fn test_document_type_parse() {
        assert_eq!("Offerte".parse::<DocumentType>().unwrap(), DocumentType::Quote);
        assert_eq!("invoice".parse::<DocumentType>().unwrap(), DocumentType::Invoice);
        assert!("lieferschein".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_document_status_default() {
        assert_eq!(DocumentStatus::default(), DocumentStatus::Draft);
    }
}
