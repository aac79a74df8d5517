//! Property tests for the pricing engine and the number allocator.

use offerten_core::money::Money;
use offerten_core::numbering::{allocate_next, format_identifier, parse_identifier, Series};
use offerten_core::pricing::{
    adjusted_price, price, worker_surcharge, AddOn, BaseComponent, PricingRequest,
};
use offerten_core::types::{TaxConfig, TaxRate};
use proptest::prelude::*;

fn series() -> impl Strategy<Value = Series> {
    prop_oneof![
        Just(Series::Quote),
        Just(Series::Receipt),
        Just(Series::Invoice),
        Just(Series::Customer),
    ]
}

fn add_on() -> impl Strategy<Value = AddOn> {
    (0i64..500_000, any::<bool>(), any::<bool>()).prop_map(|(cents, surcharge, selected)| AddOn {
        name: "Zusatz".to_string(),
        base_price: Money::from_cents(cents),
        applies_worker_surcharge: surcharge,
        selected,
    })
}

fn request() -> impl Strategy<Value = PricingRequest> {
    (
        prop::collection::vec(0i64..1_000_000, 0..4),
        prop::collection::vec(add_on(), 0..5),
        0i32..50,
        1u32..24,
        any::<bool>(),
        0u32..2_000,
    )
        .prop_map(|(bases, add_ons, workers, hours, tax_on, bps)| PricingRequest {
            base_components: bases
                .into_iter()
                .map(|c| BaseComponent::fixed("Basis", Money::from_cents(c)))
                .collect(),
            add_ons,
            workers,
            estimated_hours: hours,
            tax: TaxConfig {
                enabled: tax_on,
                rate: TaxRate::from_bps(bps),
            },
            manual_base_override: None,
        })
}

proptest! {
    #[test]
    fn total_is_subtotal_plus_tax(req in request()) {
        let result = price(&req).unwrap();
        prop_assert_eq!(result.total, result.subtotal + result.tax_amount);

        let expected_base: i64 = req.base_components.iter().map(|c| c.base_price.unwrap().cents()).sum();
        prop_assert_eq!(result.base_total.cents(), expected_base);

        // rebuilt from the request alone, without the engine's per-line figures
        let extra_workers = (req.workers as i64 - 2).max(0);
        let expected_add_ons: i64 = req
            .add_ons
            .iter()
            .filter(|a| a.selected)
            .map(|a| {
                let surcharge = if a.applies_worker_surcharge { 3_000 * extra_workers } else { 0 };
                a.base_price.cents() + surcharge
            })
            .sum();
        prop_assert_eq!(result.add_on_total.cents(), expected_add_ons);
        prop_assert_eq!(result.subtotal.cents(), expected_base + expected_add_ons);
    }

    #[test]
    fn adjusted_price_follows_the_surcharge_law(req in request()) {
        let result = price(&req).unwrap();
        let extra_workers = (req.workers as i64 - 2).max(0);

        prop_assert_eq!(result.add_ons.len(), req.add_ons.len());
        for (input, line) in req.add_ons.iter().zip(&result.add_ons) {
            let expected = if input.applies_worker_surcharge {
                input.base_price.cents() + 3_000 * extra_workers
            } else {
                input.base_price.cents()
            };
            prop_assert_eq!(line.adjusted_price.cents(), expected);
            prop_assert_eq!(line.base_price, input.base_price);
        }
    }

    #[test]
    fn disabled_tax_means_zero_tax(mut req in request()) {
        req.tax.enabled = false;
        let result = price(&req).unwrap();
        prop_assert!(result.tax_amount.is_zero());
        prop_assert_eq!(result.total, result.subtotal);
    }

    #[test]
    fn pricing_is_deterministic(req in request()) {
        prop_assert_eq!(price(&req).unwrap(), price(&req).unwrap());
    }

    #[test]
    fn flat_add_ons_ignore_workers(cents in 0i64..500_000, a in 0i32..50, b in 0i32..50) {
        let flat = AddOn::new("Reinigung", Money::from_cents(cents), true);
        prop_assert_eq!(adjusted_price(&flat, a).unwrap(), adjusted_price(&flat, b).unwrap());
    }

    #[test]
    fn surcharge_is_monotonic_in_workers(workers in 0i32..49) {
        prop_assert!(worker_surcharge(workers + 1) >= worker_surcharge(workers));
        if workers >= 2 {
            prop_assert_eq!(
                worker_surcharge(workers + 1) - worker_surcharge(workers),
                Money::from_francs(30)
            );
        }
    }

    #[test]
    fn manual_override_fixes_base_total(mut req in request(), amount in 0i64..5_000_000) {
        req.manual_base_override = Some(Money::from_cents(amount));
        let result = price(&req).unwrap();
        prop_assert_eq!(result.base_total, Money::from_cents(amount));
    }

    #[test]
    fn tax_is_within_half_a_rappen(cents in 0i64..100_000_000, bps in 0u32..10_000) {
        let tax = Money::from_cents(cents).calculate_tax(TaxRate::from_bps(bps));
        let exact = cents as i128 * bps as i128;
        let diff = (tax.cents() as i128 * 10_000 - exact).abs();
        prop_assert!(diff <= 5_000);
    }

    #[test]
    fn allocation_is_strictly_increasing(series in series(), sequence in 0u64..10_000_000) {
        let current = format_identifier(series, sequence);
        let next = allocate_next(series, Some(&current)).unwrap();

        prop_assert!(next.starts_with(series.prefix()));
        prop_assert_eq!(parse_identifier(series, &next).unwrap(), sequence + 1);
        prop_assert!(next.len() - series.prefix().len() >= 5);
        prop_assert_eq!(
            format_identifier(series, parse_identifier(series, &next).unwrap()),
            next
        );
    }

    #[test]
    fn non_digit_suffixes_are_malformed(series in series(), suffix in "[0-9]{0,4}[a-zA-Z ._+-][0-9a-z]{0,4}") {
        let value = format!("{}{}", series.prefix(), suffix);
        prop_assert!(allocate_next(series, Some(&value)).is_err());
    }
}
