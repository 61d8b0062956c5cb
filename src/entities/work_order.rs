use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{DocStatus, WorkOrderStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub production_item: String,
    pub company: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub qty: Decimal,
    pub bom_id: i64,
    pub sales_order_id: Option<i64>,
    pub sales_order_item_id: Option<i64>,
    pub source_warehouse: Option<String>,
    pub wip_warehouse: Option<String>,
    pub fg_warehouse: String,
    pub scrap_warehouse: Option<String>,
    /// Consume raw materials straight from the source warehouse on manufacture
    pub skip_transfer: bool,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub produced_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub material_transferred_for_manufacturing: Decimal,
    pub status: String,
    pub docstatus: i32,
    pub planned_start_date: DateTime<Utc>,
    pub actual_start_date: Option<DateTime<Utc>>,
    pub actual_end_date: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub planned_operating_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub actual_operating_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub additional_operating_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_operating_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn doc_status(&self) -> Option<DocStatus> {
        DocStatus::from_code(self.docstatus)
    }

    pub fn work_order_status(&self) -> Option<WorkOrderStatus> {
        WorkOrderStatus::from_str(&self.status).ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.work_order_status() == Some(WorkOrderStatus::Stopped)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bom::Entity",
        from = "Column::BomId",
        to = "super::bom::Column::Id"
    )]
    Bom,
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ProductionItem",
        to = "super::item::Column::ItemCode"
    )]
    ProductionItem,
    #[sea_orm(
        belongs_to = "super::sales_order::Entity",
        from = "Column::SalesOrderId",
        to = "super::sales_order::Column::Id"
    )]
    SalesOrder,
    #[sea_orm(has_many = "super::work_order_item::Entity")]
    RequiredItems,
    #[sea_orm(has_many = "super::work_order_operation::Entity")]
    Operations,
    #[sea_orm(has_many = "super::stock_entry::Entity")]
    StockEntries,
    #[sea_orm(has_many = "super::timesheet::Entity")]
    Timesheets,
}

impl Related<super::bom::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bom.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionItem.def()
    }
}

impl Related<super::sales_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesOrder.def()
    }
}

impl Related<super::work_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequiredItems.def()
    }
}

impl Related<super::work_order_operation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operations.def()
    }
}

impl Related<super::stock_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockEntries.def()
    }
}

impl Related<super::timesheet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timesheets.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
            if let ActiveValue::NotSet = self.docstatus {
                self.docstatus = ActiveValue::Set(DocStatus::Draft.code());
            }
        }

        if let ActiveValue::NotSet = self.status {
            self.status = ActiveValue::Set(WorkOrderStatus::Draft.to_string());
        }

        self.updated_at = ActiveValue::Set(now);

        Ok(self)
    }
}
