//! # Pricing Engine
//!
//! Turns a selection of base services and add-ons into subtotal, tax and
//! total. Pure: same request, same result, no I/O, no ambient settings.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. base_total  = manual_base_override                                  │
//! │                   OR Σ contribution(component)                          │
//! │                        fixed  → base_price                              │
//! │                        hourly → hourly_rate × hours × max(workers, 1)   │
//! │                        custom → custom_amount                           │
//! │                                                                         │
//! │  2. adjusted(add-on) = base_price + 30 × max(0, workers − 2)            │
//! │                          if applies_worker_surcharge                    │
//! │                        = base_price otherwise                           │
//! │                                                                         │
//! │  3. add_on_total = Σ adjusted(add-on) over selected add-ons             │
//! │  4. subtotal     = base_total + add_on_total                            │
//! │  5. tax_amount   = tax enabled ? subtotal × rate : 0   (rounded once)   │
//! │  6. total        = subtotal + tax_amount                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Validation
//! Missing prices are rejected with `InvalidPriceConfig` instead of being
//! treated as zero.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{AdditionalService, PricingModel, ServiceCategory, TaxConfig};
use crate::{SURCHARGE_BASELINE_WORKERS, WORKER_SURCHARGE};

// =============================================================================
// Request
// =============================================================================

/// One selected base service as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BaseComponent {
    /// Used in error messages only.
    pub name: String,
    pub pricing_model: PricingModel,
    pub base_price: Option<Money>,
    pub hourly_rate: Option<Money>,
    /// Required for `custom`, ignored otherwise.
    pub custom_amount: Option<Money>,
}

impl BaseComponent {
    /// A flat-priced component.
    pub fn fixed(name: impl Into<String>, base_price: Money) -> Self {
        BaseComponent {
            name: name.into(),
            pricing_model: PricingModel::Fixed,
            base_price: Some(base_price),
            hourly_rate: None,
            custom_amount: None,
        }
    }

    /// An hourly component.
    pub fn hourly(name: impl Into<String>, hourly_rate: Money) -> Self {
        BaseComponent {
            name: name.into(),
            pricing_model: PricingModel::Hourly,
            base_price: None,
            hourly_rate: Some(hourly_rate),
            custom_amount: None,
        }
    }

    /// A component priced per job.
    pub fn custom(name: impl Into<String>, amount: Option<Money>) -> Self {
        BaseComponent {
            name: name.into(),
            pricing_model: PricingModel::Custom,
            base_price: None,
            hourly_rate: None,
            custom_amount: amount,
        }
    }

    /// Builds the component for a catalog category.
    pub fn from_category(category: &ServiceCategory, custom_amount: Option<Money>) -> Self {
        BaseComponent {
            name: category.name.clone(),
            pricing_model: category.pricing_model,
            base_price: category.base_price,
            hourly_rate: category.hourly_rate,
            custom_amount,
        }
    }
}

/// One add-on as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddOn {
    pub name: String,
    pub base_price: Money,
    pub applies_worker_surcharge: bool,
    pub selected: bool,
}

impl AddOn {
    /// A flat add-on.
    pub fn new(name: impl Into<String>, base_price: Money, selected: bool) -> Self {
        AddOn {
            name: name.into(),
            base_price,
            applies_worker_surcharge: false,
            selected,
        }
    }

    /// An add-on that carries the per-worker surcharge.
    pub fn with_worker_surcharge(name: impl Into<String>, base_price: Money, selected: bool) -> Self {
        AddOn {
            applies_worker_surcharge: true,
            ..AddOn::new(name, base_price, selected)
        }
    }

    /// Builds the add-on for a catalog service.
    pub fn from_service(service: &AdditionalService, selected: bool) -> Self {
        AddOn {
            name: service.name.clone(),
            base_price: service.price,
            applies_worker_surcharge: service.applies_worker_surcharge,
            selected,
        }
    }
}

/// Everything the engine needs, passed in by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingRequest {
    pub base_components: Vec<BaseComponent>,
    pub add_ons: Vec<AddOn>,
    pub workers: i32,
    /// Hours assumed for `hourly` components.
    pub estimated_hours: u32,
    pub tax: TaxConfig,
    /// Replaces the computed base total outright ("Preis übernehmen").
    pub manual_base_override: Option<Money>,
}

// =============================================================================
// Result
// =============================================================================

/// Per-add-on breakdown, so a printout can show "base + surcharge".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdjustedAddOn {
    pub name: String,
    pub base_price: Money,
    pub surcharge: Money,
    pub adjusted_price: Money,
    pub selected: bool,
}

/// Output of [`price`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingResult {
    /// Contribution of each base component, in request order. Empty when
    /// a manual override replaced the base total.
    pub base_contributions: Vec<Money>,
    pub base_total: Money,
    /// Every add-on of the request, selected or not, in request order.
    pub add_ons: Vec<AdjustedAddOn>,
    pub add_on_total: Money,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total: Money,
}

// =============================================================================
// Rules
// =============================================================================

/// Surcharge for `workers` on an add-on that carries it.
///
/// ## Example
/// ```rust
/// use offerten_core::money::Money;
/// use offerten_core::pricing::worker_surcharge;
///
/// assert_eq!(worker_surcharge(2), Money::zero());
/// assert_eq!(worker_surcharge(4), Money::from_francs(60));
/// ```
pub fn worker_surcharge(workers: i32) -> Money {
    let extra = workers.saturating_sub(SURCHARGE_BASELINE_WORKERS).max(0);
    // at most i32::MAX × CHF 30, well inside i64
    WORKER_SURCHARGE.multiply_quantity(extra as i64)
}

/// Price of one add-on for a job with `workers`.
///
/// ## Errors
/// `InvalidPriceConfig` when base price plus surcharge does not fit.
pub fn adjusted_price(add_on: &AddOn, workers: i32) -> CoreResult<Money> {
    if add_on.applies_worker_surcharge {
        add_on
            .base_price
            .checked_add(worker_surcharge(workers))
            .ok_or_else(|| too_large(&format!("price of '{}'", add_on.name)))
    } else {
        Ok(add_on.base_price)
    }
}

/// What one base component contributes.
///
/// ## Errors
/// `InvalidPriceConfig` when the price field its model needs is missing
/// or negative.
pub fn base_contribution(
    component: &BaseComponent,
    workers: i32,
    estimated_hours: u32,
) -> CoreResult<Money> {
    let field = |what: &str| format!("{} of '{}'", what, component.name);

    let amount = match component.pricing_model {
        PricingModel::Fixed => component
            .base_price
            .ok_or_else(|| CoreError::invalid_price(field("base price"), "fixed price missing"))?,
        PricingModel::Hourly => {
            let rate = component.hourly_rate.ok_or_else(|| {
                CoreError::invalid_price(field("hourly rate"), "hourly rate missing")
            })?;
            if estimated_hours == 0 {
                return Err(CoreError::invalid_price(
                    "estimated hours",
                    "must be at least 1 for hourly services",
                ));
            }
            ensure_not_negative(rate, &field("hourly rate"))?;
            (estimated_hours as i64)
                .checked_mul(workers.max(1) as i64)
                .and_then(|quantity| rate.checked_mul_quantity(quantity))
                .ok_or_else(|| too_large(&field("price")))?
        }
        PricingModel::Custom => component.custom_amount.ok_or_else(|| {
            CoreError::invalid_price(field("amount"), "custom services need an explicit amount")
        })?,
    };

    ensure_not_negative(amount, &field("price"))?;
    Ok(amount)
}

fn too_large(field: &str) -> CoreError {
    CoreError::invalid_price(field, "amount too large")
}

fn checked_sum(amounts: impl IntoIterator<Item = Money>, field: &str) -> CoreResult<Money> {
    amounts
        .into_iter()
        .try_fold(Money::zero(), |sum, amount| sum.checked_add(amount))
        .ok_or_else(|| too_large(field))
}

fn ensure_not_negative(amount: Money, field: &str) -> CoreResult<()> {
    if amount.is_negative() {
        return Err(CoreError::invalid_price(field, "must not be negative"));
    }
    Ok(())
}

// =============================================================================
// Engine
// =============================================================================

/// Prices a selection.
///
/// ## User Workflow
/// ```text
/// Admin ticks "Stundensatz", sets workers to 4
///      │
///      ▼
/// price(&request) ← THIS FUNCTION (on every change, for the live total)
///      │
///      ├── Err(InvalidPriceConfig) → save button blocked, field named
///      │
///      └── Ok(result) → live total; on save the result is frozen into lines
/// ```
///
/// ## Example
/// ```rust
/// use offerten_core::money::Money;
/// use offerten_core::pricing::{price, AddOn, BaseComponent, PricingRequest};
/// use offerten_core::types::{TaxConfig, TaxRate};
///
/// let request = PricingRequest {
///     base_components: vec![BaseComponent::fixed("Umzug", Money::from_francs(1200))],
///     add_ons: vec![AddOn::with_worker_surcharge("Stundensatz", Money::from_francs(120), true)],
///     workers: 4,
///     estimated_hours: 4,
///     tax: TaxConfig::disabled(TaxRate::from_bps(770)),
///     manual_base_override: None,
/// };
///
/// let result = price(&request).unwrap();
/// assert_eq!(result.add_ons[0].adjusted_price, Money::from_francs(180));
/// assert_eq!(result.subtotal, Money::from_francs(1380));
/// assert_eq!(result.total, result.subtotal);
/// ```
pub fn price(request: &PricingRequest) -> CoreResult<PricingResult> {
    if request.workers < 0 {
        return Err(CoreError::invalid_price("workers", "must not be negative"));
    }

    let (base_contributions, base_total) = match request.manual_base_override {
        Some(amount) => {
            ensure_not_negative(amount, "manual base price")?;
            (Vec::new(), amount)
        }
        None => {
            let contributions = request
                .base_components
                .iter()
                .map(|c| base_contribution(c, request.workers, request.estimated_hours))
                .collect::<CoreResult<Vec<Money>>>()?;
            let total = checked_sum(contributions.iter().copied(), "base total")?;
            (contributions, total)
        }
    };

    let mut add_ons = Vec::with_capacity(request.add_ons.len());
    for add_on in &request.add_ons {
        ensure_not_negative(add_on.base_price, &format!("price of '{}'", add_on.name))?;

        let adjusted = adjusted_price(add_on, request.workers)?;
        add_ons.push(AdjustedAddOn {
            name: add_on.name.clone(),
            base_price: add_on.base_price,
            surcharge: adjusted - add_on.base_price,
            adjusted_price: adjusted,
            selected: add_on.selected,
        });
    }

    let add_on_total = checked_sum(
        add_ons.iter().filter(|a| a.selected).map(|a| a.adjusted_price),
        "add-on total",
    )?;

    let subtotal = base_total
        .checked_add(add_on_total)
        .ok_or_else(|| too_large("subtotal"))?;
    let tax_amount = if request.tax.enabled {
        subtotal
            .checked_tax(request.tax.rate)
            .ok_or_else(|| too_large("tax"))?
    } else {
        Money::zero()
    };
    let total = subtotal
        .checked_add(tax_amount)
        .ok_or_else(|| too_large("total"))?;

    Ok(PricingResult {
        base_contributions,
        base_total,
        add_ons,
        add_on_total,
        subtotal,
        tax_amount,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
