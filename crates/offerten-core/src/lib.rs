//! # offerten-core: Pure Business Logic for Offerten
//!
//! Everything that decides what a quote, receipt or invoice costs and which
//! number it carries lives here, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Offerten Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Admin Panel / Public Quote Form / Response Page         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ offerten-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │ numbering │  │ document  │  │   mail    │  │   │
//! │  │   │  price()  │  │ allocate_ │  │ assemble  │  │ compose   │  │   │
//! │  │   │ surcharge │  │   next()  │  │ lifecycle │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 offerten-db (Database Layer)                    │   │
//! │  │     SQLite, repositories, unique-constraint + retry issuance    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - CHF amounts in Rappen (integer arithmetic)
//! - [`types`] - Catalog, customer, document and tax types
//! - [`pricing`] - The pricing engine
//! - [`numbering`] - Document/customer number allocation
//! - [`document`] - Price-frozen assembly and the status machine
//! - [`mail`] - Composing the document email
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use offerten_core::money::Money;
//! use offerten_core::pricing::{price, AddOn, BaseComponent, PricingRequest};
//! use offerten_core::types::{TaxConfig, TaxRate};
//!
//! let request = PricingRequest {
//!     base_components: vec![BaseComponent::fixed("Umzug", Money::from_francs(1200))],
//!     add_ons: vec![AddOn::new("Reinigung", Money::from_francs(300), true)],
//!     workers: 2,
//!     estimated_hours: 4,
//!     tax: TaxConfig::enabled(TaxRate::from_bps(770)),
//!     manual_base_override: None,
//! };
//!
//! let result = price(&request).unwrap();
//! assert_eq!(result.subtotal, Money::from_francs(1500));
//! assert_eq!(result.tax_amount.cents(), 11550);
//! assert_eq!(result.total.cents(), 161550);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod mail;
pub mod money;
pub mod numbering;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use document::{CustomerResponse, DocumentInput, PricedDocument};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use numbering::{allocate_next, Series};
pub use pricing::{price, PricingRequest, PricingResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Surcharge added to the hourly-rate add-on for every worker above
/// [`SURCHARGE_BASELINE_WORKERS`].
pub const WORKER_SURCHARGE: Money = Money::from_cents(3_000);

/// Number of workers included in the hourly-rate add-on's base price.
pub const SURCHARGE_BASELINE_WORKERS: i32 = 2;

/// Default job duration used to price `hourly` categories.
///
/// Not a measured duration. Overridable through the settings record and
/// the config file.
pub const DEFAULT_ESTIMATED_HOURS: u32 = 4;

/// First number of every series (`10001`, `Q-10001`, `R-10001`, `K-10001`).
pub const SERIES_SEED: u64 = 10_001;

/// Minimum width of the numeric part of a series identifier.
pub const SERIES_MIN_WIDTH: usize = 5;

/// Upper bound for workers on one job.
pub const MAX_WORKERS: i32 = 50;

/// Upper bound for rooms and trucks on one job.
pub const MAX_UNITS: i32 = 999;
