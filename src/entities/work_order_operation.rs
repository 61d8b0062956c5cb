use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "work_order_operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub work_order_id: i64,
    pub idx: i32,
    pub operation: String,
    pub workstation: String,
    /// Planned minutes for the whole work order quantity
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub time_in_mins: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub hour_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub planned_operating_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub completed_qty: Decimal,
    pub status: String,
    /// Logged minutes across submitted timesheets
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub actual_operation_time: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub actual_operating_cost: Decimal,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::work_order::Entity",
        from = "Column::WorkOrderId",
        to = "super::work_order::Column::Id",
        on_delete = "Cascade"
    )]
    WorkOrder,
    #[sea_orm(has_many = "super::timesheet_detail::Entity")]
    TimeLogs,
}

impl Related<super::work_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkOrder.def()
    }
}

impl Related<super::timesheet_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimeLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
