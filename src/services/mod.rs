//! Document workflow services.
//!
//! Every public operation runs inside a single database transaction. Helpers
//! shared between services take a generic `ConnectionTrait` so they can join
//! the caller's transaction.

use rust_decimal::Decimal;

pub mod bins;
pub mod boms;
pub mod master_data;
pub mod sales_orders;
pub mod settings;
pub mod stock_entries;
pub mod stock_ledger;
pub mod timesheets;
pub mod work_orders;

/// Decimal places kept for quantities, rates and amounts.
pub const PRECISION: u32 = 4;

pub(crate) fn round(value: Decimal) -> Decimal {
    value.round_dp(PRECISION)
}

/// Negative residuals never count toward a reservation.
pub(crate) fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// `base × (1 + percentage / 100)`
pub(crate) fn with_allowance(base: Decimal, percentage: Decimal) -> Decimal {
    base * (Decimal::ONE + percentage / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn allowance_scales_base() {
        assert_eq!(with_allowance(dec!(2), dec!(0)), dec!(2));
        assert_eq!(with_allowance(dec!(2), dec!(50)), dec!(3));
        assert_eq!(with_allowance(dec!(10), dec!(10)), dec!(11));
    }

    #[test]
    fn residuals_are_clamped() {
        assert_eq!(non_negative(dec!(-1.5)), Decimal::ZERO);
        assert_eq!(non_negative(dec!(3)), dec!(3));
        assert_eq!(round(dec!(1.234567)), dec!(1.2346));
    }
}
