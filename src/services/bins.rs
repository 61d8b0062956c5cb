use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    entities::{bin, work_order, work_order_item, DocStatus, WorkOrderStatus},
    errors::ServiceError,
    services::{non_negative, round},
};

/// Read access to per item/warehouse stock counters.
#[derive(Clone)]
pub struct BinService {
    db: Arc<DatabaseConnection>,
}

impl BinService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the bin, creating a zeroed one if the pair has never been used.
    #[instrument(skip(self))]
    pub async fn get_bin(&self, item_code: &str, warehouse: &str) -> Result<bin::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let bin = get_or_create_bin(&txn, item_code, warehouse).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(bin)
    }
}

pub(crate) async fn get_or_create_bin<C>(
    conn: &C,
    item_code: &str,
    warehouse: &str,
) -> Result<bin::Model, ServiceError>
where
    C: ConnectionTrait,
{
    if let Some(existing) = bin::Entity::find()
        .filter(bin::Column::ItemCode.eq(item_code.to_string()))
        .filter(bin::Column::Warehouse.eq(warehouse.to_string()))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
    {
        return Ok(existing);
    }

    debug!(item_code, warehouse, "Creating bin");
    bin::ActiveModel {
        item_code: Set(item_code.to_string()),
        warehouse: Set(warehouse.to_string()),
        actual_qty: Set(Decimal::ZERO),
        ordered_qty: Set(Decimal::ZERO),
        indented_qty: Set(Decimal::ZERO),
        planned_qty: Set(Decimal::ZERO),
        reserved_qty: Set(Decimal::ZERO),
        reserved_qty_for_production: Set(Decimal::ZERO),
        projected_qty: Set(Decimal::ZERO),
        valuation_rate: Set(Decimal::ZERO),
        stock_value: Set(Decimal::ZERO),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

/// Counter changes applied to a bin; projected qty is always recomputed.
#[derive(Debug, Default, Clone)]
pub(crate) struct BinChanges {
    pub actual_qty: Option<Decimal>,
    pub planned_qty: Option<Decimal>,
    pub reserved_qty_for_production: Option<Decimal>,
    pub valuation_rate: Option<Decimal>,
    pub stock_value: Option<Decimal>,
}

pub(crate) async fn apply_bin_changes<C>(
    conn: &C,
    current: bin::Model,
    changes: BinChanges,
) -> Result<bin::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let actual = changes.actual_qty.unwrap_or(current.actual_qty);
    let planned = changes.planned_qty.unwrap_or(current.planned_qty);
    let reserved_for_production = changes
        .reserved_qty_for_production
        .unwrap_or(current.reserved_qty_for_production);
    let projected = bin::projected_qty(
        actual,
        current.ordered_qty,
        current.indented_qty,
        planned,
        current.reserved_qty,
        reserved_for_production,
    );

    let mut model: bin::ActiveModel = current.into();
    model.actual_qty = Set(actual);
    model.planned_qty = Set(planned);
    model.reserved_qty_for_production = Set(reserved_for_production);
    model.projected_qty = Set(projected);
    if let Some(rate) = changes.valuation_rate {
        model.valuation_rate = Set(rate);
    }
    if let Some(value) = changes.stock_value {
        model.stock_value = Set(value);
    }

    model.update(conn).await.map_err(ServiceError::db_error)
}

/// Σ (required − transferred) over submitted, non-stopped work orders drawing
/// this item from this warehouse. Work orders that skip the transfer step are
/// measured against consumed quantity instead.
pub(crate) async fn update_reserved_qty_for_production<C>(
    conn: &C,
    item_code: &str,
    warehouse: &str,
) -> Result<bin::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let rows = work_order_item::Entity::find()
        .filter(work_order_item::Column::ItemCode.eq(item_code.to_string()))
        .filter(work_order_item::Column::SourceWarehouse.eq(warehouse.to_string()))
        .find_also_related(work_order::Entity)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let reserved: Decimal = rows
        .iter()
        .filter_map(|(row, wo)| wo.as_ref().map(|wo| (row, wo)))
        .filter(|(_, wo)| reserves_material(wo))
        .map(|(row, wo)| {
            let moved = if wo.skip_transfer {
                row.consumed_qty
            } else {
                row.transferred_qty
            };
            non_negative(row.required_qty - moved)
        })
        .sum();

    let current = get_or_create_bin(conn, item_code, warehouse).await?;
    apply_bin_changes(
        conn,
        current,
        BinChanges {
            reserved_qty_for_production: Some(round(reserved)),
            ..Default::default()
        },
    )
    .await
}

/// Σ (qty − produced) over submitted work orders still expected to deliver
/// this item into this warehouse.
pub(crate) async fn update_planned_qty<C>(
    conn: &C,
    item_code: &str,
    warehouse: &str,
) -> Result<bin::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let orders = work_order::Entity::find()
        .filter(work_order::Column::ProductionItem.eq(item_code.to_string()))
        .filter(work_order::Column::FgWarehouse.eq(warehouse.to_string()))
        .filter(work_order::Column::Docstatus.eq(DocStatus::Submitted.code()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let planned: Decimal = orders
        .iter()
        .filter(|wo| plans_production(wo))
        .map(|wo| non_negative(wo.qty - wo.produced_qty))
        .sum();

    let current = get_or_create_bin(conn, item_code, warehouse).await?;
    apply_bin_changes(
        conn,
        current,
        BinChanges {
            planned_qty: Some(round(planned)),
            ..Default::default()
        },
    )
    .await
}

fn reserves_material(wo: &work_order::Model) -> bool {
    wo.doc_status() == Some(DocStatus::Submitted) && !wo.is_stopped()
}

fn plans_production(wo: &work_order::Model) -> bool {
    wo.doc_status() == Some(DocStatus::Submitted)
        && !matches!(
            wo.work_order_status(),
            Some(WorkOrderStatus::Stopped) | Some(WorkOrderStatus::Completed)
        )
}
