//! # Application Configuration
//!
//! Where the database lives, the pricing defaults for a fresh settings
//! record, retry bounds and the company profile used in mails.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     OFFERTEN_DB_PATH=/var/lib/offerten/offerten.db                     │
//! │     OFFERTEN_TAX_ENABLED=true                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/offerten/offerten.toml (Linux)                           │
//! │     ~/Library/Application Support/ch.offerten.offerten/offerten.toml   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "offerten.db"
//! max_connections = 5
//!
//! [pricing]
//! tax_enabled = false
//! tax_rate_bps = 810
//! estimated_hours = 4
//!
//! [numbering]
//! max_allocation_attempts = 5
//!
//! [company]
//! name = "Umzüge Meier GmbH"
//! email = "info@umzug-meier.ch"
//! public_base_url = "https://umzug-meier.ch"
//! ```

use offerten_core::mail::CompanyProfile;
use offerten_core::types::{PricingSettings, TaxConfig, TaxRate};
use offerten_core::validation;
use offerten_core::DEFAULT_ESTIMATED_HOURS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Relative paths are resolved against the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("offerten.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[pricing]`: initial values for the settings record.
///
/// Once the record exists, the admin panel edits it and these values are
/// only used when it is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingDefaults {
    #[serde(default)]
    pub tax_enabled: bool,

    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    #[serde(default = "default_estimated_hours")]
    pub estimated_hours: u32,
}

fn default_tax_rate_bps() -> u32 {
    810
}

fn default_estimated_hours() -> u32 {
    DEFAULT_ESTIMATED_HOURS
}

impl Default for PricingDefaults {
    fn default() -> Self {
        PricingDefaults {
            tax_enabled: false,
            tax_rate_bps: default_tax_rate_bps(),
            estimated_hours: default_estimated_hours(),
        }
    }
}

impl PricingDefaults {
    pub fn to_settings(&self) -> PricingSettings {
        PricingSettings {
            tax: TaxConfig {
                enabled: self.tax_enabled,
                rate: TaxRate::from_bps(self.tax_rate_bps),
            },
            estimated_hours: self.estimated_hours,
        }
    }
}

/// `[numbering]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberingSettings {
    /// Inserts tried before giving up with `AllocationConflict`.
    #[serde(default = "default_max_allocation_attempts")]
    pub max_allocation_attempts: u32,
}

fn default_max_allocation_attempts() -> u32 {
    5
}

impl Default for NumberingSettings {
    fn default() -> Self {
        NumberingSettings {
            max_allocation_attempts: default_max_allocation_attempts(),
        }
    }
}

/// `[company]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySettings {
    #[serde(default = "default_company_name")]
    pub name: String,

    #[serde(default = "default_company_email")]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_company_name() -> String {
    "Offerten".to_string()
}

fn default_company_email() -> String {
    "info@example.ch".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for CompanySettings {
    fn default() -> Self {
        CompanySettings {
            name: default_company_name(),
            email: default_company_email(),
            phone: None,
            public_base_url: default_public_base_url(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingDefaults,

    #[serde(default)]
    pub numbering: NumberingSettings,

    #[serde(default)]
    pub company: CompanySettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (offerten.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |e: offerten_core::ValidationError| ConfigError::Invalid(e.to_string());

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        validation::validate_tax_rate_bps(self.pricing.tax_rate_bps).map_err(invalid)?;
        validation::validate_estimated_hours(self.pricing.estimated_hours).map_err(invalid)?;

        if self.numbering.max_allocation_attempts == 0 {
            return Err(ConfigError::Invalid(
                "numbering.max_allocation_attempts must be greater than 0".into(),
            ));
        }

        validation::validate_email(&self.company.email).map_err(invalid)?;
        validation::validate_base_url("company.public_base_url", &self.company.public_base_url)
            .map_err(invalid)?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("OFFERTEN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(hours) = std::env::var("OFFERTEN_ESTIMATED_HOURS") {
            match hours.parse::<u32>() {
                Ok(h) => self.pricing.estimated_hours = h,
                Err(_) => warn!(value = %hours, "Ignoring invalid OFFERTEN_ESTIMATED_HOURS"),
            }
        }

        if let Ok(enabled) = std::env::var("OFFERTEN_TAX_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.pricing.tax_enabled = true,
                "0" | "false" | "no" | "off" => self.pricing.tax_enabled = false,
                _ => warn!(value = %enabled, "Ignoring invalid OFFERTEN_TAX_ENABLED"),
            }
        }

        if let Ok(bps) = std::env::var("OFFERTEN_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(b) => self.pricing.tax_rate_bps = b,
                Err(_) => warn!(value = %bps, "Ignoring invalid OFFERTEN_TAX_RATE_BPS"),
            }
        }

        if let Ok(attempts) = std::env::var("OFFERTEN_MAX_ALLOCATION_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(a) => self.numbering.max_allocation_attempts = a,
                Err(_) => {
                    warn!(value = %attempts, "Ignoring invalid OFFERTEN_MAX_ALLOCATION_ATTEMPTS")
                }
            }
        }

        if let Ok(url) = std::env::var("OFFERTEN_PUBLIC_BASE_URL") {
            debug!(url = %url, "Overriding public base URL from environment");
            self.company.public_base_url = url;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ch", "offerten", "offerten")
            .map(|dirs| dirs.config_dir().join("offerten.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .max_allocation_attempts(self.numbering.max_allocation_attempts)
    }

    /// Company profile for mail composition.
    pub fn company_profile(&self) -> CompanyProfile {
        CompanyProfile {
            name: self.company.name.clone(),
            email: self.company.email.clone(),
            phone: self.company.phone.clone(),
            public_base_url: self.company.public_base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pricing.estimated_hours, 4);
        assert_eq!(config.pricing.tax_rate_bps, 810);
        assert!(!config.pricing.tax_enabled);
        assert_eq!(config.numbering.max_allocation_attempts, 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [pricing]
            tax_enabled = true
            tax_rate_bps = 770

            [company]
            name = "Umzüge Meier GmbH"
            "#,
        )
        .unwrap();

        assert!(config.pricing.tax_enabled);
        assert_eq!(config.pricing.estimated_hours, 4);
        assert_eq!(config.database.path, PathBuf::from("offerten.db"));
        assert_eq!(config.company.email, "info@example.ch");

        let settings = config.pricing.to_settings();
        assert_eq!(settings.tax, TaxConfig::enabled(TaxRate::from_bps(770)));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();

        config.pricing.estimated_hours = 0;
        assert!(config.validate().is_err());

        config.pricing.estimated_hours = 4;
        config.pricing.tax_rate_bps = 20_000;
        assert!(config.validate().is_err());

        config.pricing.tax_rate_bps = 810;
        config.numbering.max_allocation_attempts = 0;
        assert!(config.validate().is_err());

        config.numbering.max_allocation_attempts = 3;
        config.company.public_base_url = "umzug-meier.ch".to_string();
        assert!(config.validate().is_err());

        config.company.public_base_url = "https://umzug-meier.ch".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("offerten-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[numbering]\nmax_allocation_attempts = 9\n").unwrap();

        let config = AppConfig::load(Some(path.clone())).unwrap();
        assert_eq!(config.numbering.max_allocation_attempts, 9);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_toml_round_trip_sections() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[pricing]"));
        assert!(toml_str.contains("[numbering]"));
        assert!(toml_str.contains("[company]"));
    }

    #[test]
    fn test_company_profile() {
        let profile = AppConfig::default().company_profile();
        assert_eq!(profile.public_base_url, "http://localhost:3000");
    }
}
