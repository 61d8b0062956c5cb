use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};
use tracing::debug;

use crate::{
    entities::stock_ledger_entry,
    errors::ServiceError,
    services::{
        bins::{apply_bin_changes, get_or_create_bin, BinChanges},
        round,
    },
};

/// A single quantity movement to record against a voucher.
#[derive(Debug, Clone)]
pub(crate) struct Movement<'a> {
    pub item_code: &'a str,
    pub warehouse: &'a str,
    /// Positive for incoming, negative for outgoing
    pub qty: Decimal,
    /// Valuation of incoming quantity; ignored for outgoing movements
    pub incoming_rate: Decimal,
    pub voucher_type: &'a str,
    pub voucher_id: i64,
    pub voucher_detail_id: i64,
    pub posting_date: DateTime<Utc>,
}

/// Result of a moving-average valuation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Valuation {
    pub qty_after: Decimal,
    pub valuation_rate: Decimal,
    pub stock_value: Decimal,
}

/// Moving average: incoming stock is blended into the rate, outgoing stock
/// leaves at the current rate.
pub(crate) fn moving_average(
    actual_qty: Decimal,
    valuation_rate: Decimal,
    stock_value: Decimal,
    qty: Decimal,
    incoming_rate: Decimal,
) -> Valuation {
    let qty_after = actual_qty + qty;

    if qty > Decimal::ZERO {
        let value = stock_value + qty * incoming_rate;
        let rate = if qty_after > Decimal::ZERO {
            value / qty_after
        } else {
            incoming_rate
        };
        Valuation {
            qty_after,
            valuation_rate: round(rate),
            stock_value: round(value),
        }
    } else {
        Valuation {
            qty_after,
            valuation_rate,
            stock_value: round(qty_after * valuation_rate),
        }
    }
}

/// Posts one movement, updating the bin's actual qty and valuation.
pub(crate) async fn post_movement<C>(
    conn: &C,
    movement: Movement<'_>,
) -> Result<stock_ledger_entry::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let bin = get_or_create_bin(conn, movement.item_code, movement.warehouse).await?;

    let valuation = moving_average(
        bin.actual_qty,
        bin.valuation_rate,
        bin.stock_value,
        movement.qty,
        movement.incoming_rate,
    );

    if valuation.qty_after < Decimal::ZERO {
        return Err(ServiceError::InsufficientStock(format!(
            "{} units of {} needed in Warehouse {} to complete this transaction",
            -valuation.qty_after,
            movement.item_code,
            movement.warehouse
        )));
    }

    let stock_value_difference = valuation.stock_value - bin.stock_value;
    let previous_value = bin.stock_value;

    apply_bin_changes(
        conn,
        bin,
        BinChanges {
            actual_qty: Some(valuation.qty_after),
            valuation_rate: Some(valuation.valuation_rate),
            stock_value: Some(valuation.stock_value),
            ..Default::default()
        },
    )
    .await?;

    debug!(
        item_code = movement.item_code,
        warehouse = movement.warehouse,
        qty = %movement.qty,
        value_before = %previous_value,
        value_after = %valuation.stock_value,
        "Posted stock movement"
    );

    stock_ledger_entry::ActiveModel {
        item_code: Set(movement.item_code.to_string()),
        warehouse: Set(movement.warehouse.to_string()),
        posting_date: Set(movement.posting_date),
        voucher_type: Set(movement.voucher_type.to_string()),
        voucher_id: Set(movement.voucher_id),
        voucher_detail_id: Set(movement.voucher_detail_id),
        actual_qty: Set(movement.qty),
        qty_after_transaction: Set(valuation.qty_after),
        incoming_rate: Set(if movement.qty > Decimal::ZERO {
            movement.incoming_rate
        } else {
            Decimal::ZERO
        }),
        valuation_rate: Set(valuation.valuation_rate),
        stock_value_difference: Set(stock_value_difference),
        is_cancelled: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

/// Reverses every live ledger entry of a voucher, newest first.
pub(crate) async fn cancel_voucher_movements<C>(
    conn: &C,
    voucher_type: &str,
    voucher_id: i64,
) -> Result<usize, ServiceError>
where
    C: ConnectionTrait,
{
    let entries = stock_ledger_entry::Entity::find()
        .filter(stock_ledger_entry::Column::VoucherType.eq(voucher_type.to_string()))
        .filter(stock_ledger_entry::Column::VoucherId.eq(voucher_id))
        .filter(stock_ledger_entry::Column::IsCancelled.eq(false))
        .order_by_desc(stock_ledger_entry::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let count = entries.len();
    for entry in entries {
        let bin = get_or_create_bin(conn, &entry.item_code, &entry.warehouse).await?;
        let qty_after = bin.actual_qty - entry.actual_qty;

        if qty_after < Decimal::ZERO {
            return Err(ServiceError::InsufficientStock(format!(
                "{} units of {} needed in Warehouse {} to cancel this transaction",
                -qty_after, entry.item_code, entry.warehouse
            )));
        }

        let stock_value = bin.stock_value - entry.stock_value_difference;
        let valuation_rate = if qty_after > Decimal::ZERO {
            round(stock_value / qty_after)
        } else {
            bin.valuation_rate
        };

        apply_bin_changes(
            conn,
            bin,
            BinChanges {
                actual_qty: Some(qty_after),
                valuation_rate: Some(valuation_rate),
                stock_value: Some(round(stock_value)),
                ..Default::default()
            },
        )
        .await?;

        let mut cancelled: stock_ledger_entry::ActiveModel = entry.into();
        cancelled.is_cancelled = Set(true);
        cancelled.update(conn).await.map_err(ServiceError::db_error)?;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn incoming_blends_rate() {
        let v = moving_average(dec!(10), dec!(100), dec!(1000), dec!(10), dec!(200));
        assert_eq!(v.qty_after, dec!(20));
        assert_eq!(v.valuation_rate, dec!(150));
        assert_eq!(v.stock_value, dec!(3000));
    }

    #[test]
    fn outgoing_keeps_rate() {
        let v = moving_average(dec!(20), dec!(150), dec!(3000), dec!(-5), Decimal::ZERO);
        assert_eq!(v.qty_after, dec!(15));
        assert_eq!(v.valuation_rate, dec!(150));
        assert_eq!(v.stock_value, dec!(2250));
    }

    #[test]
    fn first_receipt_takes_incoming_rate() {
        let v = moving_average(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, dec!(4), dec!(25));
        assert_eq!(v.valuation_rate, dec!(25));
        assert_eq!(v.stock_value, dec!(100));
    }
}
