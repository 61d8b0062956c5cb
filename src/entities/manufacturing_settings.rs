use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Single-row settings table; the row always has id 1.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manufacturing_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub overproduction_percentage_for_work_order: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub overproduction_percentage_for_sales_order: Decimal,
    pub allow_production_on_holidays: bool,
    pub default_wip_warehouse: Option<String>,
    pub default_fg_warehouse: Option<String>,
    pub default_scrap_warehouse: Option<String>,
    pub updated_at: DateTime<Utc>,
}

pub const SETTINGS_ROW_ID: i32 = 1;

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
