use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One stock movement of one item in one warehouse.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub item_code: String,
    pub warehouse: String,
    pub posting_date: DateTime<Utc>,
    pub voucher_type: String,
    pub voucher_id: i64,
    pub voucher_detail_id: i64,
    /// Signed quantity change
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub actual_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty_after_transaction: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub incoming_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub valuation_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub stock_value_difference: Decimal,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemCode",
        to = "super::item::Column::ItemCode"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
