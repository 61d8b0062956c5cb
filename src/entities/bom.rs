use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "boms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Production item
    pub item: String,
    pub company: String,
    /// Batch size the child rows are expressed for
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity: Decimal,
    pub is_active: bool,
    pub is_default: bool,
    pub with_operations: bool,
    pub docstatus: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub operating_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub raw_material_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub scrap_material_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::Item",
        to = "super::item::Column::ItemCode"
    )]
    Item,
    #[sea_orm(has_many = "super::bom_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::bom_operation::Entity")]
    Operations,
    #[sea_orm(has_many = "super::bom_scrap_item::Entity")]
    ScrapItems,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::bom_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::bom_operation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operations.def()
    }
}

impl Related<super::bom_scrap_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScrapItems.def()
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
        }
        self.updated_at = ActiveValue::Set(now);
        Ok(self)
    }
}
