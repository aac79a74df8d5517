//! # Error Types
//!
//! Domain-specific error types for offerten-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  offerten-core errors (this file)                                      │
//! │  ├── CoreError        - Pricing, numbering, lifecycle failures         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  offerten-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, AllocationConflict           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller / admin panel    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed computation never leaves anything half-applied: the core has
//! no state to corrupt, and callers only persist after `Ok`.

use thiserror::Error;

use crate::types::DocumentStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A pricing input violates a precondition.
    ///
    /// ## When This Occurs
    /// - `fixed` category without a base price
    /// - `hourly` category without an hourly rate
    /// - `custom` category without an explicit amount
    /// - negative amounts or a negative worker count
    ///
    /// The document is not saved; the message names the field.
    #[error("Invalid price configuration for {field}: {reason}")]
    InvalidPriceConfig { field: String, reason: String },

    /// The stored maximum identifier of a series cannot be parsed.
    ///
    /// Never auto-recovered: restarting the sequence would hand out
    /// duplicate numbers. An operator has to fix the stored value.
    #[error("Malformed {series} series state: '{value}'")]
    MalformedSeriesState { series: String, value: String },

    /// The requested status change is not part of the lifecycle.
    #[error("Document {document_number} cannot move from {from:?} to {to:?}")]
    InvalidStatusTransition {
        document_number: String,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// The document is signed or finished and can no longer be re-priced.
    #[error("Document {document_number} is {status:?} and can no longer be edited")]
    DocumentLocked {
        document_number: String,
        status: DocumentStatus,
    },

    /// Stored totals do not match the totals recomputed from the lines.
    #[error("Totals of document {document_number} do not match its lines: {detail}")]
    TotalsMismatch {
        document_number: String,
        detail: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidPriceConfig error.
    pub fn invalid_price(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidPriceConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid email, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A catalog entry is inactive and cannot be selected for new documents.
    #[error("{field} '{name}' is no longer offered")]
    Inactive { field: String, name: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::invalid_price("workers", "must not be negative");
        assert_eq!(
            err.to_string(),
            "Invalid price configuration for workers: must not be negative"
        );

        let err = CoreError::MalformedSeriesState {
            series: "quote".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed quote series state: 'abc'");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer name".to_string(),
        };
        assert_eq!(err.to_string(), "customer name is required");

        let err = ValidationError::Inactive {
            field: "category".to_string(),
            name: "Lagerung".to_string(),
        };
        assert_eq!(err.to_string(), "category 'Lagerung' is no longer offered");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "email".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
