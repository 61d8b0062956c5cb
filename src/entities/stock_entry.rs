use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{DocStatus, StockEntryPurpose};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub purpose: String,
    pub company: String,
    pub work_order_id: Option<i64>,
    pub bom_id: Option<i64>,
    /// Finished-good quantity this entry transfers material for or produces
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub fg_completed_qty: Decimal,
    pub from_warehouse: Option<String>,
    pub to_warehouse: Option<String>,
    pub posting_date: DateTime<Utc>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_outgoing_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_incoming_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_additional_costs: Decimal,
    pub docstatus: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn doc_status(&self) -> Option<DocStatus> {
        DocStatus::from_code(self.docstatus)
    }

    pub fn stock_entry_purpose(&self) -> Option<StockEntryPurpose> {
        StockEntryPurpose::from_str(&self.purpose).ok()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::work_order::Entity",
        from = "Column::WorkOrderId",
        to = "super::work_order::Column::Id"
    )]
    WorkOrder,
    #[sea_orm(has_many = "super::stock_entry_detail::Entity")]
    Details,
}

impl Related<super::work_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkOrder.def()
    }
}

impl Related<super::stock_entry_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Details.def()
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
        self.updated_at = ActiveValue::Set(now);
        Ok(self)
    }
}
