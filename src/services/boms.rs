use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{bom, bom_item, bom_operation, bom_scrap_item, workstation, DocStatus},
    errors::ServiceError,
    services::{master_data::get_item, round},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewBomItem {
    #[validate(length(min = 1))]
    pub item_code: String,
    pub qty: Decimal,
    #[serde(default)]
    pub rate: Decimal,
    pub source_warehouse: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewBomOperation {
    #[validate(length(min = 1))]
    pub operation: String,
    pub workstation: String,
    /// Minutes per BOM quantity
    pub time_in_mins: Decimal,
    /// Falls back to the workstation hour rate when omitted
    pub hour_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewBomScrapItem {
    pub item_code: String,
    pub stock_qty: Decimal,
    #[serde(default)]
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewBom {
    #[validate(length(min = 1))]
    pub item: String,
    pub company: String,
    pub quantity: Decimal,
    #[serde(default = "default_true")]
    pub is_default: bool,
    #[validate]
    pub items: Vec<NewBomItem>,
    #[serde(default)]
    #[validate]
    pub operations: Vec<NewBomOperation>,
    #[serde(default)]
    pub scrap_items: Vec<NewBomScrapItem>,
}

fn default_true() -> bool {
    true
}

/// A BOM with its child tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomDetail {
    pub bom: bom::Model,
    pub items: Vec<bom_item::Model>,
    pub operations: Vec<bom_operation::Model>,
    pub scrap_items: Vec<bom_scrap_item::Model>,
}

/// Quantities, times and rates a BOM can be saved with.
fn check_quantities(new_bom: &NewBom) -> Result<(), ServiceError> {
    if new_bom.quantity <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "BOM quantity must be positive, got: {}",
            new_bom.quantity
        )));
    }
    if new_bom.items.is_empty() {
        return Err(ServiceError::ValidationError(
            "BOM must have at least one raw material".to_string(),
        ));
    }
    for row in &new_bom.items {
        if row.qty <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "Quantity for raw material {} must be positive",
                row.item_code
            )));
        }
        if row.rate.is_sign_negative() {
            return Err(ServiceError::InvalidInput(format!(
                "Rate for raw material {} cannot be negative",
                row.item_code
            )));
        }
    }
    for op in &new_bom.operations {
        if op.time_in_mins.is_sign_negative() {
            return Err(ServiceError::InvalidInput(format!(
                "Operation time for {} cannot be negative",
                op.operation
            )));
        }
        if op.hour_rate.is_some_and(|rate| rate.is_sign_negative()) {
            return Err(ServiceError::InvalidInput(format!(
                "Hour rate for {} cannot be negative",
                op.operation
            )));
        }
    }
    for row in &new_bom.scrap_items {
        if row.stock_qty <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(format!(
                "Scrap quantity for {} must be positive",
                row.item_code
            )));
        }
        if row.rate.is_sign_negative() {
            return Err(ServiceError::InvalidInput(format!(
                "Rate for scrap item {} cannot be negative",
                row.item_code
            )));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct BomService {
    db: Arc<DatabaseConnection>,
}

impl BomService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a submitted, active BOM. A default BOM replaces any previous default.
    #[instrument(skip(self, new_bom), fields(item = %new_bom.item))]
    pub async fn create_bom(&self, new_bom: NewBom) -> Result<BomDetail, ServiceError> {
        new_bom.validate()?;

        check_quantities(&new_bom)?;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        get_item(&txn, &new_bom.item).await?;
        for row in &new_bom.items {
            get_item(&txn, &row.item_code).await?;
        }
        for row in &new_bom.scrap_items {
            get_item(&txn, &row.item_code).await?;
        }

        if new_bom.is_default {
            let previous = bom::Entity::find()
                .filter(bom::Column::Item.eq(new_bom.item.clone()))
                .filter(bom::Column::IsDefault.eq(true))
                .all(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            for prev in previous {
                let mut prev: bom::ActiveModel = prev.into();
                prev.is_default = Set(false);
                prev.update(&txn).await.map_err(ServiceError::db_error)?;
            }
        }

        let mut operations = Vec::with_capacity(new_bom.operations.len());
        for op in &new_bom.operations {
            let ws = workstation::Entity::find_by_id(op.workstation.clone())
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "Workstation {} not found",
                        op.workstation
                    ))
                })?;
            operations.push((op, op.hour_rate.unwrap_or(ws.hour_rate)));
        }

        let raw_material_cost: Decimal = new_bom.items.iter().map(|r| r.qty * r.rate).sum();
        let scrap_material_cost: Decimal = new_bom
            .scrap_items
            .iter()
            .map(|r| r.stock_qty * r.rate)
            .sum();
        let operating_cost: Decimal = operations
            .iter()
            .map(|(op, rate)| op.time_in_mins * rate / Decimal::from(60))
            .sum();

        let header = bom::ActiveModel {
            item: Set(new_bom.item.clone()),
            company: Set(new_bom.company.clone()),
            quantity: Set(new_bom.quantity),
            is_active: Set(true),
            is_default: Set(new_bom.is_default),
            with_operations: Set(!operations.is_empty()),
            docstatus: Set(DocStatus::Submitted.code()),
            operating_cost: Set(round(operating_cost)),
            raw_material_cost: Set(round(raw_material_cost)),
            scrap_material_cost: Set(round(scrap_material_cost)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(new_bom.items.len());
        for (idx, row) in new_bom.items.iter().enumerate() {
            let created = bom_item::ActiveModel {
                bom_id: Set(header.id),
                idx: Set(idx as i32 + 1),
                item_code: Set(row.item_code.clone()),
                qty: Set(row.qty),
                stock_qty: Set(row.qty),
                rate: Set(row.rate),
                source_warehouse: Set(row.source_warehouse.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(created);
        }

        let mut bom_operations = Vec::with_capacity(operations.len());
        for (idx, (op, hour_rate)) in operations.into_iter().enumerate() {
            let created = bom_operation::ActiveModel {
                bom_id: Set(header.id),
                idx: Set(idx as i32 + 1),
                operation: Set(op.operation.clone()),
                workstation: Set(op.workstation.clone()),
                time_in_mins: Set(op.time_in_mins),
                hour_rate: Set(hour_rate),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            bom_operations.push(created);
        }

        let mut scrap_items = Vec::with_capacity(new_bom.scrap_items.len());
        for row in &new_bom.scrap_items {
            let created = bom_scrap_item::ActiveModel {
                bom_id: Set(header.id),
                item_code: Set(row.item_code.clone()),
                stock_qty: Set(row.stock_qty),
                rate: Set(row.rate),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            scrap_items.push(created);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("manufacturing.boms.created", 1);
        info!(bom_id = header.id, "BOM created");

        Ok(BomDetail {
            bom: header,
            items,
            operations: bom_operations,
            scrap_items,
        })
    }

    pub async fn get_bom(&self, bom_id: i64) -> Result<BomDetail, ServiceError> {
        load_bom_detail(&*self.db, bom_id).await
    }
}

pub(crate) async fn load_bom_detail<C>(conn: &C, bom_id: i64) -> Result<BomDetail, ServiceError>
where
    C: ConnectionTrait,
{
    let bom = bom::Entity::find_by_id(bom_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("BOM {}", bom_id)))?;

    let items = bom_item::Entity::find()
        .filter(bom_item::Column::BomId.eq(bom_id))
        .order_by_asc(bom_item::Column::Idx)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let operations = bom_operation::Entity::find()
        .filter(bom_operation::Column::BomId.eq(bom_id))
        .order_by_asc(bom_operation::Column::Idx)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let scrap_items = bom_scrap_item::Entity::find()
        .filter(bom_scrap_item::Column::BomId.eq(bom_id))
        .order_by_asc(bom_scrap_item::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(BomDetail {
        bom,
        items,
        operations,
        scrap_items,
    })
}

/// The active, submitted default BOM of an item.
pub(crate) async fn default_bom_for<C>(
    conn: &C,
    item_code: &str,
) -> Result<Option<bom::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    bom::Entity::find()
        .filter(bom::Column::Item.eq(item_code.to_string()))
        .filter(bom::Column::IsDefault.eq(true))
        .filter(bom::Column::IsActive.eq(true))
        .filter(bom::Column::Docstatus.eq(DocStatus::Submitted.code()))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn bom() -> NewBom {
        NewBom {
            item: "_Test FG Item".into(),
            company: "_Test Company".into(),
            quantity: dec!(1),
            is_default: true,
            items: vec![NewBomItem {
                item_code: "_Test Item".into(),
                qty: dec!(2),
                rate: dec!(100),
                source_warehouse: None,
            }],
            operations: vec![NewBomOperation {
                operation: "Cutting".into(),
                workstation: "Saw".into(),
                time_in_mins: dec!(30),
                hour_rate: None,
            }],
            scrap_items: vec![NewBomScrapItem {
                item_code: "_Test Scrap Item".into(),
                stock_qty: dec!(0.5),
                rate: dec!(10),
            }],
        }
    }

    #[test]
    fn well_formed_bom_passes() {
        assert!(check_quantities(&bom()).is_ok());
    }

    #[test]
    fn scrap_qty_must_be_positive() {
        let mut negative = bom();
        negative.scrap_items[0].stock_qty = dec!(-0.5);
        assert_matches!(
            check_quantities(&negative),
            Err(ServiceError::InvalidInput(msg)) if msg.contains("Scrap quantity")
        );

        let mut zero = bom();
        zero.scrap_items[0].stock_qty = Decimal::ZERO;
        assert!(check_quantities(&zero).is_err());
    }

    #[test]
    fn negative_times_and_rates_are_rejected() {
        let mut time = bom();
        time.operations[0].time_in_mins = dec!(-30);
        assert_matches!(
            check_quantities(&time),
            Err(ServiceError::InvalidInput(msg)) if msg.contains("Operation time")
        );

        let mut hour_rate = bom();
        hour_rate.operations[0].hour_rate = Some(dec!(-1));
        assert!(check_quantities(&hour_rate).is_err());

        let mut scrap_rate = bom();
        scrap_rate.scrap_items[0].rate = dec!(-10);
        assert!(check_quantities(&scrap_rate).is_err());

        let mut raw_rate = bom();
        raw_rate.items[0].rate = dec!(-100);
        assert!(check_quantities(&raw_rate).is_err());
    }

    #[test]
    fn zero_operation_time_is_allowed() {
        let mut instant = bom();
        instant.operations[0].time_in_mins = Decimal::ZERO;
        assert!(check_quantities(&instant).is_ok());
    }
}
