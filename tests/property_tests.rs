//! Property-based tests for the manufacturing arithmetic.
//!
//! Rates, scrap quantities and status derivation are pure functions, so they
//! are checked across a wide range of inputs here rather than case by case.

use proptest::prelude::*;
use rust_decimal::Decimal;
use stateset_manufacturing::{
    entities::{DocStatus, OperationStatus, WorkOrderStatus},
    services::{
        stock_entries::{finished_good_rate, scrap_qty},
        work_orders::{derive_status, operation_status, total_operating_cost},
    },
};

/// Non-negative decimals with up to four places, matching stored precision.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..=4).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

fn positive_qty() -> impl Strategy<Value = Decimal> {
    (1i64..100_000, 0u32..=2).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn finished_good_rate_is_never_negative(
        raw in amount(),
        additional in amount(),
        scrap in amount(),
        qty in positive_qty(),
    ) {
        prop_assert!(finished_good_rate(raw, additional, scrap, qty) >= Decimal::ZERO);
    }

    #[test]
    fn finished_good_rate_recovers_total_value(
        raw in amount(),
        additional in amount(),
        qty in positive_qty(),
    ) {
        let rate = finished_good_rate(raw, additional, Decimal::ZERO, qty);
        let drift = (rate * qty - (raw + additional)).abs();
        // Rounding the rate to four places loses at most half a unit per finished good.
        prop_assert!(drift <= Decimal::new(5, 5) * qty, "drift {} for qty {}", drift, qty);
    }

    #[test]
    fn finished_good_rate_without_qty_is_zero(raw in amount(), additional in amount()) {
        prop_assert_eq!(finished_good_rate(raw, additional, Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn one_batch_yields_bom_scrap(scrap in amount(), batch in positive_qty()) {
        prop_assert_eq!(scrap_qty(batch, scrap, batch), scrap);
    }

    #[test]
    fn scrap_grows_with_production(
        scrap in amount(),
        batch in positive_qty(),
        fg in positive_qty(),
        extra in positive_qty(),
    ) {
        prop_assert!(scrap_qty(fg + extra, scrap, batch) >= scrap_qty(fg, scrap, batch));
    }

    #[test]
    fn unsubmitted_status_ignores_progress(
        qty in positive_qty(),
        produced in amount(),
        transferred in amount(),
    ) {
        prop_assert_eq!(
            derive_status(DocStatus::Draft, qty, produced, transferred),
            WorkOrderStatus::Draft
        );
        prop_assert_eq!(
            derive_status(DocStatus::Cancelled, qty, produced, transferred),
            WorkOrderStatus::Cancelled
        );
    }

    #[test]
    fn submitted_status_follows_progress(
        qty in positive_qty(),
        produced in amount(),
        transferred in amount(),
    ) {
        let status = derive_status(DocStatus::Submitted, qty, produced, transferred);
        let expected = if produced >= qty {
            WorkOrderStatus::Completed
        } else if produced.is_zero() && transferred.is_zero() {
            WorkOrderStatus::NotStarted
        } else {
            WorkOrderStatus::InProcess
        };
        prop_assert_eq!(status, expected);
    }

    #[test]
    fn operation_completes_at_work_order_qty(qty in positive_qty(), extra in amount()) {
        prop_assert_eq!(operation_status(qty + extra, qty), OperationStatus::Completed);
        prop_assert_eq!(operation_status(Decimal::ZERO, qty), OperationStatus::Pending);
    }

    #[test]
    fn logged_cost_replaces_planned(
        planned in amount(),
        actual in amount(),
        additional in amount(),
    ) {
        let total = total_operating_cost(planned, actual, additional);
        if actual.is_zero() {
            prop_assert_eq!(total, planned + additional);
        } else {
            prop_assert_eq!(total, actual + additional);
        }
    }
}
