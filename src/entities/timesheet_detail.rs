use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A time log against one work order operation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "timesheet_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub timesheet_id: i64,
    pub idx: i32,
    pub operation_id: Option<i64>,
    pub workstation: Option<String>,
    pub from_time: DateTime<Utc>,
    pub to_time: DateTime<Utc>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub hours: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub completed_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub costing_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub costing_amount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::timesheet::Entity",
        from = "Column::TimesheetId",
        to = "super::timesheet::Column::Id",
        on_delete = "Cascade"
    )]
    Timesheet,
    #[sea_orm(
        belongs_to = "super::work_order_operation::Entity",
        from = "Column::OperationId",
        to = "super::work_order_operation::Column::Id"
    )]
    Operation,
}

impl Related<super::timesheet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timesheet.def()
    }
}

impl Related<super::work_order_operation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
