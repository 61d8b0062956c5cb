use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_entry_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub stock_entry_id: i64,
    pub idx: i32,
    pub item_code: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty: Decimal,
    /// Source warehouse
    pub s_warehouse: Option<String>,
    /// Target warehouse
    pub t_warehouse: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub basic_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub basic_amount: Decimal,
    pub is_finished_item: bool,
    pub is_scrap_item: bool,
    pub bom_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_entry::Entity",
        from = "Column::StockEntryId",
        to = "super::stock_entry::Column::Id",
        on_delete = "Cascade"
    )]
    StockEntry,
}

impl Related<super::stock_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
