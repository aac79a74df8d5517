//! # Validation Module
//!
//! Input validation for everything the admin panel and the public quote
//! form hand to Offerten.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Admin panel / public form                                    │
//! │  ├── Required fields, input masks                                      │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, ranges, formats                                          │
//! │  └── Runs before pricing, so bad input never reaches the engine        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE document and customer numbers                              │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use offerten_core::validation::{validate_email, validate_workers};
//!
//! validate_email("kunde@example.ch").unwrap();
//! validate_workers(4).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Acceptance, CustomerSnapshot};
use crate::{MAX_UNITS, MAX_WORKERS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for the estimated job duration.
pub const MAX_ESTIMATED_HOURS: u32 = 100;

/// Upper bound for any single catalog price or manual amount (CHF 1'000'000).
pub const MAX_AMOUNT: Money = Money::from_cents(100_000_000);

/// Upper bound for an encoded signature image.
pub const MAX_SIGNATURE_LEN: usize = 2 * 1024 * 1024;

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    optional_text(field, value, max)
}

fn optional_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a customer name.
///
/// ## Example
/// ```rust
/// use offerten_core::validation::validate_customer_name;
///
/// assert!(validate_customer_name("Muster AG").is_ok());
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    required_text("customer name", name, 200)
}

/// Validates an email address.
///
/// ## Rules
/// - exactly one `@`
/// - non-empty local part
/// - domain with at least one dot, not at either end
/// - no whitespace, at most 254 characters
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }
    optional_text("email", email, 254)?;

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing '@'"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@domain.ch"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a dot"));
    }

    Ok(())
}

/// Validates the contact block printed on a document.
pub fn validate_customer_snapshot(customer: &CustomerSnapshot) -> ValidationResult<()> {
    validate_customer_name(&customer.name)?;

    if let Some(street) = &customer.street {
        optional_text("street", street, 200)?;
    }
    if let Some(postal_code) = &customer.postal_code {
        optional_text("postal code", postal_code, 10)?;
    }
    if let Some(city) = &customer.city {
        optional_text("city", city, 100)?;
    }
    if let Some(phone) = &customer.phone {
        optional_text("phone", phone, 50)?;
    }
    if let Some(email) = customer.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates a category or add-on name.
pub fn validate_catalog_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, 100)
}

/// Validates a category code.
///
/// ## Rules
/// - 1 to 32 characters
/// - uppercase letters, digits and underscores only
///
/// ## Example
/// ```rust
/// use offerten_core::validation::validate_category_code;
///
/// assert!(validate_category_code("KLAVIER_TRANSPORT").is_ok());
/// assert!(validate_category_code("umzug").is_err());
/// ```
pub fn validate_category_code(code: &str) -> ValidationResult<()> {
    required_text("category code", code, 32)?;

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "category code".to_string(),
            reason: "must contain only A-Z, 0-9 and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates free-text notes on a document.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(notes) => optional_text("notes", notes, 2000),
        None => Ok(()),
    }
}

/// Validates a customer's acceptance of a quote.
///
/// Location and date are required. The signature, when present, must be an
/// image data URL.
pub fn validate_acceptance(acceptance: &Acceptance) -> ValidationResult<()> {
    required_text("location", &acceptance.location, 100)?;
    required_text("date", &acceptance.date, 50)?;

    if let Some(signature) = &acceptance.signature {
        if !signature.starts_with("data:image/") {
            return Err(ValidationError::InvalidFormat {
                field: "signature".to_string(),
                reason: "must be an image data URL".to_string(),
            });
        }
        if signature.len() > MAX_SIGNATURE_LEN {
            return Err(ValidationError::TooLong {
                field: "signature".to_string(),
                max: MAX_SIGNATURE_LEN,
            });
        }
    }

    Ok(())
}

/// Validates an absolute http(s) base URL such as the public site address.
pub fn validate_base_url(field: &str, url: &str) -> ValidationResult<()> {
    required_text(field, url, 500)?;

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must start with http:// or https://".to_string(),
        })?;

    if rest.trim_end_matches('/').is_empty() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "host is missing".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn in_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Validates the number of workers on a job.
///
/// Zero is allowed; hourly categories count at least one worker anyway.
pub fn validate_workers(workers: i32) -> ValidationResult<()> {
    in_range("workers", workers as i64, 0, MAX_WORKERS as i64)
}

/// Validates a room or truck count.
pub fn validate_units(field: &str, value: i32) -> ValidationResult<()> {
    in_range(field, value as i64, 0, MAX_UNITS as i64)
}

/// Validates a catalog price or a manually entered amount.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    in_range(field, amount.cents(), 0, MAX_AMOUNT.cents())
}

/// Validates a tax rate in basis points (0 - 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    in_range("tax rate", bps as i64, 0, 10_000)
}

/// Validates the estimated hours used for hourly categories.
pub fn validate_estimated_hours(hours: u32) -> ValidationResult<()> {
    in_range("estimated hours", hours as i64, 1, MAX_ESTIMATED_HOURS as i64)
}

// =============================================================================
// ID Validators
// =============================================================================

/// Validates a UUID string.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
