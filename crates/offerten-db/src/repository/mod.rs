//! # Repository Module
//!
//! Database repository implementations for Offerten.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories                                         │
//! │                                                                         │
//! │  Admin panel / response page                                           │
//! │       │                                                                 │
//! │       │  db.issuer().issue(request)                                    │
//! │       ▼                                                                 │
//! │  DocumentIssuer  (resolve ids → price → allocate → insert, retry)      │
//! │       │                                                                 │
//! │       ├──► CatalogRepository    categories, additional services        │
//! │       ├──► CustomerRepository   customers, K- numbers                  │
//! │       ├──► DocumentRepository   documents + frozen lines               │
//! │       └──► SettingsRepository   MWST, estimated hours                  │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │           SQLite Database                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`] - Service categories and additional services
//! - [`CustomerRepository`] - Customer records
//! - [`DocumentRepository`] - Quotes, receipts, invoices and their lines
//! - [`SettingsRepository`] - The pricing settings record

pub mod catalog;
pub mod customer;
pub mod document;
pub mod settings;

pub use catalog::{CatalogRepository, CategoryDraft, ServiceDraft};
pub use customer::CustomerRepository;
pub use document::{DocumentFilter, DocumentRepository};
pub use settings::SettingsRepository;
