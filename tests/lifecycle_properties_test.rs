//! Property tests for the rate card and the shipment lifecycle rules.

use cargolink_api::{
    config::PricingConfig,
    models::{
        lifecycle::{is_forward_transition, progress_position, PROGRESS_STEPS},
        ServiceType, ShipmentStatus,
    },
    pricing::{CostInput, Dimensions, RateTableCalculator},
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn any_status() -> impl Strategy<Value = ShipmentStatus> {
    prop::sample::select(ShipmentStatus::ALL.to_vec())
}

fn any_service() -> impl Strategy<Value = ServiceType> {
    prop_oneof![
        Just(ServiceType::Standard),
        Just(ServiceType::Express),
        Just(ServiceType::Overnight),
        Just(ServiceType::International),
    ]
}

// weight and value in hundredths, dimensions in whole centimetres
fn any_parcel() -> impl Strategy<Value = CostInput> {
    (
        any_service(),
        1i64..50_000,
        0i64..1_000_000,
        proptest::option::of((1i64..200, 1i64..200, 1i64..200)),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(service_type, weight, value, dims, signature_required, insurance_required)| {
                CostInput {
                    service_type,
                    weight_kg: Decimal::new(weight, 2),
                    dimensions: dims.map(|(l, w, h)| Dimensions {
                        length_cm: Decimal::from(l),
                        width_cm: Decimal::from(w),
                        height_cm: Decimal::from(h),
                    }),
                    declared_value: Decimal::new(value, 2),
                    signature_required,
                    insurance_required,
                }
            },
        )
}

fn calculator() -> RateTableCalculator {
    RateTableCalculator::from_config(&PricingConfig::default()).expect("default rate card")
}

proptest! {
    #[test]
    fn breakdown_adds_up_to_the_cent(input in any_parcel()) {
        let breakdown = calculator().price(&input).expect("priceable parcel");

        prop_assert!(breakdown.is_consistent());
        prop_assert_eq!(breakdown.total_cost, breakdown.subtotal() + breakdown.tax_amount);
        prop_assert!(breakdown.total_cost > Decimal::ZERO);
        prop_assert!(breakdown.billable_weight_kg >= input.weight_kg.round_dp(2));
        prop_assert_eq!(breakdown.signature_cost.is_zero(), !input.signature_required);
        prop_assert_eq!(breakdown.insurance_cost.is_zero(), !input.insurance_required);
    }

    #[test]
    fn heavier_parcels_never_cost_less(input in any_parcel(), extra in 1i64..10_000) {
        let calc = calculator();
        let lighter = calc.price(&input).expect("priceable parcel");

        let mut heavier = input.clone();
        heavier.weight_kg += Decimal::new(extra, 2);
        let heavier = calc.price(&heavier).expect("priceable parcel");

        prop_assert!(heavier.total_cost >= lighter.total_cost);
        prop_assert_eq!(heavier.estimated_delivery_days, lighter.estimated_delivery_days);
    }

    #[test]
    fn pricing_is_deterministic(input in any_parcel()) {
        let calc = calculator();
        prop_assert_eq!(calc.price(&input).unwrap(), calc.price(&input).unwrap());
    }

    #[test]
    fn terminal_statuses_are_final(from in any_status(), to in any_status()) {
        if from.is_terminal() {
            prop_assert!(!is_forward_transition(from, to));
        }
    }

    #[test]
    fn exception_and_cancel_are_reachable_from_any_live_status(from in any_status()) {
        prop_assume!(!from.is_terminal());
        prop_assert!(is_forward_transition(from, ShipmentStatus::Exception));
        prop_assert!(is_forward_transition(from, ShipmentStatus::Cancelled));
    }

    #[test]
    fn accepted_progression_steps_never_go_backwards(from in any_status(), to in any_status()) {
        if let (Some(current), Some(next)) = (from.progression_rank(), to.progression_rank()) {
            prop_assert_eq!(is_forward_transition(from, to), !from.is_terminal() && next >= current);
        }
    }

    #[test]
    fn progress_stays_on_the_bar(count in 0usize..500) {
        match progress_position(count) {
            None => prop_assert_eq!(count, 0),
            Some(position) => {
                prop_assert!(position < PROGRESS_STEPS.len());
                prop_assert_eq!(position, (count - 1).min(PROGRESS_STEPS.len() - 1));
            }
        }
    }
}
