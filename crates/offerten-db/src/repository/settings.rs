//! # Settings Repository
//!
//! The single pricing settings record (MWST switch, MWST rate, estimated
//! hours for hourly categories). Callers read it once per pricing request
//! and pass the values into the pricing engine.

use chrono::Utc;
use offerten_core::types::{PricingSettings, TaxConfig, TaxRate};
use offerten_core::validation;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct SettingsRow {
    tax_enabled: bool,
    tax_rate_bps: i64,
    estimated_hours: i64,
}

impl TryFrom<SettingsRow> for PricingSettings {
    type Error = DbError;

    fn try_from(row: SettingsRow) -> DbResult<Self> {
        let bps = u32::try_from(row.tax_rate_bps)
            .map_err(|_| DbError::corrupt("settings", "1", "tax rate out of range"))?;
        let estimated_hours = u32::try_from(row.estimated_hours)
            .map_err(|_| DbError::corrupt("settings", "1", "estimated hours out of range"))?;

        Ok(PricingSettings {
            tax: TaxConfig {
                enabled: row.tax_enabled,
                rate: TaxRate::from_bps(bps),
            },
            estimated_hours,
        })
    }
}

/// Repository for the settings record.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Current settings. Built-in defaults when the record was never created.
    pub async fn get(&self) -> DbResult<PricingSettings> {
        let row: Option<SettingsRow> = sqlx::query_as(
            "SELECT tax_enabled, tax_rate_bps, estimated_hours FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Ok(PricingSettings::default()),
        }
    }

    /// Creates the record from `defaults` unless it already exists.
    ///
    /// Returns `true` if the record was created.
    pub async fn initialize(&self, defaults: &PricingSettings) -> DbResult<bool> {
        validate(defaults)?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO settings (id, tax_enabled, tax_rate_bps, estimated_hours, updated_at)
            VALUES (1, ?1, ?2, ?3, ?4)
            "#,
        )
        .bind(defaults.tax.enabled)
        .bind(defaults.tax.rate.bps() as i64)
        .bind(defaults.estimated_hours as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        if created {
            info!(
                tax_enabled = defaults.tax.enabled,
                tax_rate_bps = defaults.tax.rate.bps(),
                estimated_hours = defaults.estimated_hours,
                "Settings record created"
            );
        }
        Ok(created)
    }

    /// Replaces the settings. Documents already issued keep their frozen
    /// tax values.
    pub async fn update(&self, settings: &PricingSettings) -> DbResult<PricingSettings> {
        validate(settings)?;

        debug!(?settings, "Updating settings");

        sqlx::query(
            r#"
            INSERT INTO settings (id, tax_enabled, tax_rate_bps, estimated_hours, updated_at)
            VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                tax_enabled = excluded.tax_enabled,
                tax_rate_bps = excluded.tax_rate_bps,
                estimated_hours = excluded.estimated_hours,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.tax.enabled)
        .bind(settings.tax.rate.bps() as i64)
        .bind(settings.estimated_hours as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get().await
    }
}

fn validate(settings: &PricingSettings) -> DbResult<()> {
    validation::validate_tax_rate_bps(settings.tax.rate.bps())?;
    validation::validate_estimated_hours(settings.estimated_hours)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use offerten_core::{CoreError, ValidationError};

    async fn repo() -> SettingsRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().settings()
    }

    #[tokio::test]
    async fn test_defaults_without_record() {
        let repo = repo().await;
        let settings = repo.get().await.unwrap();

        assert!(!settings.tax.enabled);
        assert_eq!(settings.tax.rate.bps(), 810);
        assert_eq!(settings.estimated_hours, 4);
    }

    #[tokio::test]
    async fn test_initialize_only_once() {
        let repo = repo().await;
        let first = PricingSettings {
            tax: TaxConfig::enabled(TaxRate::from_bps(770)),
            estimated_hours: 5,
        };
        assert!(repo.initialize(&first).await.unwrap());
        assert!(!repo.initialize(&PricingSettings::default()).await.unwrap());

        assert_eq!(repo.get().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_update() {
        let repo = repo().await;
        repo.initialize(&PricingSettings::default()).await.unwrap();

        let updated = repo
            .update(&PricingSettings {
                tax: TaxConfig::enabled(TaxRate::from_bps(810)),
                estimated_hours: 8,
            })
            .await
            .unwrap();
        assert!(updated.tax.enabled);
        assert_eq!(updated.estimated_hours, 8);
    }

    #[tokio::test]
    async fn test_update_rejects_zero_hours() {
        let repo = repo().await;
        let err = repo
            .update(&PricingSettings {
                tax: TaxConfig::default(),
                estimated_hours: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(repo.get().await.unwrap(), PricingSettings::default());
    }
}
