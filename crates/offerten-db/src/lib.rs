//! # offerten-db: Database Layer for Offerten
//!
//! Storage, configuration and document issuance for Offerten.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Offerten Data Flow                               │
//! │                                                                         │
//! │  Admin panel (create quote)        Response page (accept / reject)     │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   offerten-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ DocumentIssuer│    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (issuer.rs)  │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Catalog       │    │              │  │   │
//! │  │   │ price, number │───►│ Customer      │    │ 001_initial  │  │   │
//! │  │   │ retry, status │    │ Document      │    │              │  │   │
//! │  │   │               │    │ Settings      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           └──── Database (pool.rs) ◄── AppConfig (config.rs)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   offerten.db (WAL)                                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `offerten.toml` loading and environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, customer, document and settings storage
//! - [`issuer`] - Numbered issuance with retry, lifecycle operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use offerten_db::{AppConfig, Database};
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::open(&config).await?;
//!
//! let quote = db.issuer().issue(&request).await?;
//! let mail = db.issuer().compose_mail(&quote.id, &config.company_profile()).await?;
//! db.issuer().mark_sent(&quote.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod issuer;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError, ConfigResult};
pub use error::{DbError, DbResult};
pub use issuer::{CategoryChoice, DocumentIssuer, DocumentRequest};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::{CatalogRepository, CategoryDraft, ServiceDraft};
pub use repository::customer::CustomerRepository;
pub use repository::document::{DocumentFilter, DocumentRepository};
pub use repository::settings::SettingsRepository;
