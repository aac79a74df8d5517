//! # Numbering Module
//!
//! Allocates the next identifier of a number series from the highest one
//! issued so far.
//!
//! ## Series
//! ```text
//! ┌──────────┬────────┬───────────┬─────────────────────────────────────┐
//! │ Series   │ Prefix │ Seed      │ Sequence                            │
//! ├──────────┼────────┼───────────┼─────────────────────────────────────┤
//! │ Quote    │ (none) │ 10001     │ 10001, 10002, … 99999, 100000       │
//! │ Receipt  │ Q-     │ Q-10001   │ Q-10001, Q-10002, …                 │
//! │ Invoice  │ R-     │ R-10001   │ R-10001, … R-99999, R-100000        │
//! │ Customer │ K-     │ K-10001   │ K-10001, K-10002, …                 │
//! └──────────┴────────┴───────────┴─────────────────────────────────────┘
//! ```
//! The numeric part is zero-padded to a minimum of five digits and simply
//! grows wider when the sequence passes 99999.
//!
//! ## Concurrency
//! [`allocate_next`] is a pure function of the maximum it is given. Two
//! callers holding the same maximum get the same answer; uniqueness comes
//! from the unique index in the database and the retry loop in
//! `offerten-db`'s `DocumentIssuer`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{SERIES_MIN_WIDTH, SERIES_SEED};

/// An independent number sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Quote,
    Receipt,
    Invoice,
    Customer,
}

impl Series {
    /// Every series, in display order.
    pub const ALL: [Series; 4] = [
        Series::Quote,
        Series::Receipt,
        Series::Invoice,
        Series::Customer,
    ];

    /// Text in front of the numeric part.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Series::Quote => "",
            Series::Receipt => "Q-",
            Series::Invoice => "R-",
            Series::Customer => "K-",
        }
    }

    /// The first identifier of the series.
    pub fn seed(&self) -> String {
        format_identifier(*self, SERIES_SEED)
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Series::Quote => write!(f, "quote"),
            Series::Receipt => write!(f, "receipt"),
            Series::Invoice => write!(f, "invoice"),
            Series::Customer => write!(f, "customer"),
        }
    }
}

impl FromStr for Series {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quote" => Ok(Series::Quote),
            "receipt" => Ok(Series::Receipt),
            "invoice" => Ok(Series::Invoice),
            "customer" => Ok(Series::Customer),
            _ => Err(ValidationError::NotAllowed {
                field: "series".to_string(),
                allowed: Series::ALL.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

/// Formats a sequence number with the series prefix and padding.
///
/// ## Example
/// ```rust
/// use offerten_core::numbering::{format_identifier, Series};
///
/// assert_eq!(format_identifier(Series::Quote, 42), "00042");
/// assert_eq!(format_identifier(Series::Invoice, 100000), "R-100000");
/// ```
pub fn format_identifier(series: Series, sequence: u64) -> String {
    format!(
        "{}{:0width$}",
        series.prefix(),
        sequence,
        width = SERIES_MIN_WIDTH
    )
}

/// Extracts the sequence number from an identifier of `series`.
///
/// ## Errors
/// `MalformedSeriesState` when the prefix is missing or anything other than
/// ASCII digits follows it.
pub fn parse_identifier(series: Series, identifier: &str) -> CoreResult<u64> {
    let malformed = || CoreError::MalformedSeriesState {
        series: series.to_string(),
        value: identifier.to_string(),
    };

    let digits = identifier
        .strip_prefix(series.prefix())
        .ok_or_else(malformed)?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    digits.parse::<u64>().map_err(|_| malformed())
}

/// Produces the identifier following `current_max` in `series`.
///
/// ## User Workflow
/// ```text
/// "Neue Rechnung" clicked
///      │
///      ▼
/// storage: current max invoice number ──► Some("R-10042")
///      │
///      ▼
/// allocate_next(Invoice, Some("R-10042")) ← THIS FUNCTION
///      │
///      ▼
/// "R-10043" ──► insert (unique index) ──► conflict? re-read and retry
/// ```
///
/// ## Example
/// ```rust
/// use offerten_core::numbering::{allocate_next, Series};
///
/// assert_eq!(allocate_next(Series::Quote, None).unwrap(), "10001");
/// assert_eq!(allocate_next(Series::Receipt, Some("Q-10042")).unwrap(), "Q-10043");
/// assert_eq!(allocate_next(Series::Invoice, Some("R-99999")).unwrap(), "R-100000");
/// assert!(allocate_next(Series::Quote, Some("abc")).is_err());
/// ```
pub fn allocate_next(series: Series, current_max: Option<&str>) -> CoreResult<String> {
    let Some(current) = current_max else {
        return Ok(series.seed());
    };

    let sequence = parse_identifier(series, current)?;
    let next = sequence
        .checked_add(1)
        .ok_or_else(|| CoreError::MalformedSeriesState {
            series: series.to_string(),
            value: current.to_string(),
        })?;

    Ok(format_identifier(series, next))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds() {
        assert_eq!(allocate_next(Series::Quote, None).unwrap(), "10001");
        assert_eq!(allocate_next(Series::Receipt, None).unwrap(), "Q-10001");
        assert_eq!(allocate_next(Series::Invoice, None).unwrap(), "R-10001");
        assert_eq!(allocate_next(Series::Customer, None).unwrap(), "K-10001");
    }

    #[test]
    fn test_increment() {
        assert_eq!(allocate_next(Series::Quote, Some("10001")).unwrap(), "10002");
        assert_eq!(allocate_next(Series::Receipt, Some("Q-10042")).unwrap(), "Q-10043");
        assert_eq!(allocate_next(Series::Customer, Some("K-10099")).unwrap(), "K-10100");
    }

    #[test]
    fn test_width_grows_past_five_digits() {
        assert_eq!(allocate_next(Series::Invoice, Some("R-99999")).unwrap(), "R-100000");
        assert_eq!(allocate_next(Series::Quote, Some("99999")).unwrap(), "100000");
        assert_eq!(allocate_next(Series::Quote, Some("100000")).unwrap(), "100001");
    }

    #[test]
    fn test_short_legacy_numbers_are_padded() {
        assert_eq!(allocate_next(Series::Quote, Some("7")).unwrap(), "00008");
        assert_eq!(allocate_next(Series::Receipt, Some("Q-00041")).unwrap(), "Q-00042");
    }

    #[test]
    fn test_malformed_state() {
        let malformed = |series, value| {
            matches!(
                allocate_next(series, Some(value)),
                Err(CoreError::MalformedSeriesState { .. })
            )
        };

        assert!(malformed(Series::Quote, "abc"));
        assert!(malformed(Series::Quote, ""));
        assert!(malformed(Series::Quote, "+10001"));
        assert!(malformed(Series::Quote, "Q-10001"));
        assert!(malformed(Series::Receipt, "10001"));
        assert!(malformed(Series::Receipt, "Q-"));
        assert!(malformed(Series::Receipt, "Q-10a01"));
        assert!(malformed(Series::Invoice, "Q-10001"));
        assert!(malformed(Series::Invoice, "R-99999999999999999999999"));
        assert!(malformed(Series::Invoice, &format!("R-{}", u64::MAX)));
    }

    #[test]
    fn test_malformed_state_names_the_value() {
        let err = allocate_next(Series::Quote, Some("abc")).unwrap_err();
        assert_eq!(err.to_string(), "Malformed quote series state: 'abc'");
    }

    #[test]
    fn test_series_parse() {
        assert_eq!("invoice".parse::<Series>().unwrap(), Series::Invoice);
        assert!("offer".parse::<Series>().is_err());
    }
}
