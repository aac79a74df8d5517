//! # Catalog Repository
//!
//! Service categories and additional services, as maintained in the admin
//! panel.
//!
//! ## Lifecycle of a Catalog Entry
//! ```text
//! create ──► active ──► (edit name / price) ──► deactivate
//!                                                  │
//!                 still printed on old documents ◄─┘ (lines are snapshots)
//! ```
//! Entries are never deleted: documents keep their own copy of name and
//! price, and deactivated entries stay selectable on documents that
//! already carry them.

use chrono::{DateTime, Utc};
use offerten_core::error::CoreError;
use offerten_core::money::Money;
use offerten_core::types::{infer_worker_surcharge, AdditionalService, PricingModel, ServiceCategory};
use offerten_core::validation;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

// =============================================================================
// Drafts (admin panel input)
// =============================================================================

/// Fields of a service category as entered in the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub code: String,
    pub name: String,
    pub pricing_model: PricingModel,
    pub base_price: Option<Money>,
    pub hourly_rate: Option<Money>,
}

impl CategoryDraft {
    /// Checks the fields and that the price the model needs is present.
    pub fn validate(&self) -> DbResult<()> {
        validation::validate_category_code(&self.code)?;
        validation::validate_catalog_name(&self.name)?;

        if let Some(price) = self.base_price {
            validation::validate_amount("base price", price)?;
        }
        if let Some(rate) = self.hourly_rate {
            validation::validate_amount("hourly rate", rate)?;
        }

        match self.pricing_model {
            PricingModel::Fixed if self.base_price.is_none() => Err(CoreError::invalid_price(
                "base price",
                "fixed categories need a base price",
            )
            .into()),
            PricingModel::Hourly if self.hourly_rate.is_none() => Err(CoreError::invalid_price(
                "hourly rate",
                "hourly categories need an hourly rate",
            )
            .into()),
            _ => Ok(()),
        }
    }
}

/// Fields of an additional service as entered in the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub name: String,
    pub price: Money,
    /// `None`: inferred from the name on create, unchanged on update.
    pub applies_worker_surcharge: Option<bool>,
}

impl ServiceDraft {
    pub fn validate(&self) -> DbResult<()> {
        validation::validate_catalog_name(&self.name)?;
        validation::validate_amount("price", self.price)?;
        Ok(())
    }
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: String,
    code: String,
    name: String,
    pricing_model: PricingModel,
    base_price_cents: Option<i64>,
    hourly_rate_cents: Option<i64>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for ServiceCategory {
    fn from(row: CategoryRow) -> Self {
        ServiceCategory {
            id: row.id,
            code: row.code,
            name: row.name,
            pricing_model: row.pricing_model,
            base_price: row.base_price_cents.map(Money::from_cents),
            hourly_rate: row.hourly_rate_cents.map(Money::from_cents),
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: String,
    name: String,
    price_cents: i64,
    applies_worker_surcharge: bool,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ServiceRow> for AdditionalService {
    fn from(row: ServiceRow) -> Self {
        AdditionalService {
            id: row.id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            applies_worker_surcharge: row.applies_worker_surcharge,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CATEGORY_COLUMNS: &str = r#"
    id, code, name, pricing_model, base_price_cents, hourly_rate_cents,
    active, created_at, updated_at
"#;

const SERVICE_COLUMNS: &str = r#"
    id, name, price_cents, applies_worker_surcharge, active, created_at, updated_at
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for the service catalog.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Service categories
    // -------------------------------------------------------------------------

    /// Creates a category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already taken
    pub async fn create_category(&self, draft: &CategoryDraft) -> DbResult<ServiceCategory> {
        draft.validate()?;

        let now = Utc::now();
        let category = ServiceCategory {
            id: Uuid::new_v4().to_string(),
            code: draft.code.trim().to_string(),
            name: draft.name.trim().to_string(),
            pricing_model: draft.pricing_model,
            base_price: draft.base_price,
            hourly_rate: draft.hourly_rate,
            active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(code = %category.code, "Inserting service category");

        sqlx::query(
            r#"
            INSERT INTO service_categories (
                id, code, name, pricing_model, base_price_cents, hourly_rate_cents,
                active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&category.id)
        .bind(&category.code)
        .bind(&category.name)
        .bind(category.pricing_model)
        .bind(category.base_price.map(|m| m.cents()))
        .bind(category.hourly_rate.map(|m| m.cents()))
        .bind(category.active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &category.code),
            other => other,
        })?;

        info!(code = %category.code, model = ?category.pricing_model, "Service category created");
        Ok(category)
    }

    /// Updates code, name, model and prices. Existing documents are untouched.
    pub async fn update_category(&self, id: &str, draft: &CategoryDraft) -> DbResult<ServiceCategory> {
        draft.validate()?;

        debug!(id = %id, "Updating service category");

        let result = sqlx::query(
            r#"
            UPDATE service_categories SET
                code = ?2,
                name = ?3,
                pricing_model = ?4,
                base_price_cents = ?5,
                hourly_rate_cents = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(draft.code.trim())
        .bind(draft.name.trim())
        .bind(draft.pricing_model)
        .bind(draft.base_price.map(|m| m.cents()))
        .bind(draft.hourly_rate.map(|m| m.cents()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service category", id));
        }

        self.get_category(id)
            .await?
            .ok_or_else(|| DbError::not_found("Service category", id))
    }

    /// Activates or deactivates a category.
    pub async fn set_category_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting service category active flag");

        let result = sqlx::query(
            "UPDATE service_categories SET active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service category", id));
        }
        Ok(())
    }

    /// Gets a category by its ID.
    pub async fn get_category(&self, id: &str) -> DbResult<Option<ServiceCategory>> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM service_categories WHERE id = ?1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ServiceCategory::from))
    }

    /// Gets a category by its code (e.g. `UMZUG`).
    pub async fn get_category_by_code(&self, code: &str) -> DbResult<Option<ServiceCategory>> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM service_categories WHERE code = ?1",
            CATEGORY_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ServiceCategory::from))
    }

    /// Lists categories sorted by name. Inactive ones only when asked for.
    pub async fn list_categories(&self, include_inactive: bool) -> DbResult<Vec<ServiceCategory>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM service_categories WHERE active = 1 OR ?1 ORDER BY name",
            CATEGORY_COLUMNS
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ServiceCategory::from).collect())
    }

    // -------------------------------------------------------------------------
    // Additional services
    // -------------------------------------------------------------------------

    /// Creates an add-on.
    ///
    /// Without an explicit flag, `applies_worker_surcharge` is set from the
    /// name ("Stundensatz" → true). The flag is stored and never re-derived.
    pub async fn create_service(&self, draft: &ServiceDraft) -> DbResult<AdditionalService> {
        draft.validate()?;

        let now = Utc::now();
        let name = draft.name.trim().to_string();
        let service = AdditionalService {
            id: Uuid::new_v4().to_string(),
            applies_worker_surcharge: draft
                .applies_worker_surcharge
                .unwrap_or_else(|| infer_worker_surcharge(&name)),
            name,
            price: draft.price,
            active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %service.name, "Inserting additional service");

        sqlx::query(
            r#"
            INSERT INTO additional_services (
                id, name, price_cents, applies_worker_surcharge, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(service.price.cents())
        .bind(service.applies_worker_surcharge)
        .bind(service.active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            name = %service.name,
            surcharge = service.applies_worker_surcharge,
            "Additional service created"
        );
        Ok(service)
    }

    /// Updates name and price, and the surcharge flag when given.
    pub async fn update_service(&self, id: &str, draft: &ServiceDraft) -> DbResult<AdditionalService> {
        draft.validate()?;

        debug!(id = %id, "Updating additional service");

        let result = sqlx::query(
            r#"
            UPDATE additional_services SET
                name = ?2,
                price_cents = ?3,
                applies_worker_surcharge = COALESCE(?4, applies_worker_surcharge),
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(draft.name.trim())
        .bind(draft.price.cents())
        .bind(draft.applies_worker_surcharge)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Additional service", id));
        }

        self.get_service(id)
            .await?
            .ok_or_else(|| DbError::not_found("Additional service", id))
    }

    /// Activates or deactivates an add-on.
    pub async fn set_service_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting additional service active flag");

        let result = sqlx::query(
            "UPDATE additional_services SET active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Additional service", id));
        }
        Ok(())
    }

    /// Gets an add-on by its ID.
    pub async fn get_service(&self, id: &str) -> DbResult<Option<AdditionalService>> {
        let row: Option<ServiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM additional_services WHERE id = ?1",
            SERVICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AdditionalService::from))
    }

    /// Lists add-ons sorted by name. Inactive ones only when asked for.
    pub async fn list_services(&self, include_inactive: bool) -> DbResult<Vec<AdditionalService>> {
        let rows: Vec<ServiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM additional_services WHERE active = 1 OR ?1 ORDER BY name",
            SERVICE_COLUMNS
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AdditionalService::from).collect())
    }

    /// Counts categories and add-ons (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<(i64, i64)> {
        let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service_categories")
            .fetch_one(&self.pool)
            .await?;
        let services: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM additional_services")
            .fetch_one(&self.pool)
            .await?;

        Ok((categories, services))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> CatalogRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().catalog()
    }

    fn umzug() -> CategoryDraft {
        CategoryDraft {
            code: "UMZUG".to_string(),
            name: "Umzug".to_string(),
            pricing_model: PricingModel::Fixed,
            base_price: Some(Money::from_francs(1200)),
            hourly_rate: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_category() {
        let repo = repo().await;
        let created = repo.create_category(&umzug()).await.unwrap();

        let by_id = repo.get_category(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "UMZUG");
        assert_eq!(by_id.pricing_model, PricingModel::Fixed);
        assert_eq!(by_id.base_price, Some(Money::from_francs(1200)));
        assert!(by_id.hourly_rate.is_none());

        let by_code = repo.get_category_by_code("UMZUG").await.unwrap().unwrap();
        assert_eq!(by_code.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let repo = repo().await;
        repo.create_category(&umzug()).await.unwrap();

        let err = repo.create_category(&umzug()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_category_without_needed_price_is_rejected() {
        let repo = repo().await;
        let mut draft = umzug();
        draft.pricing_model = PricingModel::Hourly;

        let err = repo.create_category(&draft).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidPriceConfig { .. })));

        draft.code = "umzug".to_string();
        assert!(repo.create_category(&draft).await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_deactivate_category() {
        let repo = repo().await;
        let created = repo.create_category(&umzug()).await.unwrap();

        let mut draft = umzug();
        draft.base_price = Some(Money::from_francs(1350));
        let updated = repo.update_category(&created.id, &draft).await.unwrap();
        assert_eq!(updated.base_price, Some(Money::from_francs(1350)));

        repo.set_category_active(&created.id, false).await.unwrap();
        assert!(repo.list_categories(false).await.unwrap().is_empty());
        assert_eq!(repo.list_categories(true).await.unwrap().len(), 1);

        let err = repo.set_category_active("missing", true).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_service_surcharge_flag_inferred_once() {
        let repo = repo().await;

        let stundensatz = repo
            .create_service(&ServiceDraft {
                name: "Stundensatz".to_string(),
                price: Money::from_francs(120),
                applies_worker_surcharge: None,
            })
            .await
            .unwrap();
        assert!(stundensatz.applies_worker_surcharge);

        // Renaming keeps the stored flag
        let renamed = repo
            .update_service(
                &stundensatz.id,
                &ServiceDraft {
                    name: "Mehraufwand pro Stunde".to_string(),
                    price: Money::from_francs(125),
                    applies_worker_surcharge: None,
                },
            )
            .await
            .unwrap();
        assert!(renamed.applies_worker_surcharge);
        assert_eq!(renamed.price, Money::from_francs(125));

        // Explicit flag wins
        let reinigung = repo
            .create_service(&ServiceDraft {
                name: "Reinigung".to_string(),
                price: Money::from_francs(300),
                applies_worker_surcharge: Some(true),
            })
            .await
            .unwrap();
        assert!(reinigung.applies_worker_surcharge);
    }

    #[tokio::test]
    async fn test_list_services_and_count() {
        let repo = repo().await;
        for (name, francs) in [("Reinigung", 300), ("Entsorgung", 150)] {
            repo.create_service(&ServiceDraft {
                name: name.to_string(),
                price: Money::from_francs(francs),
                applies_worker_surcharge: None,
            })
            .await
            .unwrap();
        }

        let services = repo.list_services(false).await.unwrap();
        assert_eq!(services[0].name, "Entsorgung");
        assert_eq!(services.len(), 2);

        repo.set_service_active(&services[0].id, false).await.unwrap();
        assert_eq!(repo.list_services(false).await.unwrap().len(), 1);
        assert_eq!(repo.count().await.unwrap(), (0, 2));
    }
}
